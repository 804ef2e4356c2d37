//! part-at-a-time readers for EnSight Gold geometry files

use crate::mesh::NodeIds;
use crate::prelude::*;

use super::error::{ConnectivityOutOfRange, GeometryError, UnknownElement};
use super::{is_c_binary, AsciiSource, BinarySource};

/// reads geometry parts in file order, in either encoding
pub(crate) enum GeometryReader {
    Ascii(AsciiGeometry),
    Binary(BinaryGeometry),
}

impl GeometryReader {
    pub(crate) fn open(path: &Path) -> Result<GeometryReader, GeometryError> {
        if is_c_binary(path)? {
            Ok(GeometryReader::Binary(BinaryGeometry::open(path)?))
        } else {
            Ok(GeometryReader::Ascii(AsciiGeometry::open(path)?))
        }
    }

    pub(crate) fn next_part(&mut self) -> Result<Option<Block>, GeometryError> {
        match self {
            GeometryReader::Ascii(reader) => reader.next_part(),
            GeometryReader::Binary(reader) => reader.next_part(),
        }
    }
}

/// `node id` / `element id` header modes. `given` means an id list is
/// stored in the file before the coordinates / connectivity; the stored
/// ids are read and discarded because this crate renumbers on output anyway
fn ids_stored(mode: &str) -> bool {
    mode.trim() == "given"
}

/// 1-based connectivity from the file checked and shifted to 0-based
fn build_cells(
    part: usize,
    kind: ElementKind,
    count: usize,
    raw: &[i32],
    point_count: usize,
    cells: &mut Vec<Cell>,
) -> Result<(), GeometryError> {
    let per = kind.node_count();
    debug_assert_eq!(raw.len(), count * per);

    for (offset, chunk) in raw.chunks_exact(per).enumerate() {
        let mut nodes = NodeIds::with_capacity(per);
        for &id in chunk {
            if id < 1 || id as usize > point_count {
                return Err(ConnectivityOutOfRange::new(
                    part,
                    cells.len() + offset,
                    id.max(0) as u32,
                    point_count,
                )
                .into());
            }
            nodes.push((id - 1) as u32);
        }
        cells.push(Cell::new(kind, nodes));
    }

    Ok(())
}

/// x y z coordinate streams zipped into points
fn build_points(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Vec<Point3<f32>> {
    x.into_iter()
        .zip(y)
        .zip(z)
        .map(|((x, y), z)| Point3::new(x, y, z))
        .collect()
}

pub(crate) struct AsciiGeometry {
    source: AsciiSource,
    node_ids_stored: bool,
    element_ids_stored: bool,
}

impl AsciiGeometry {
    fn open(path: &Path) -> Result<AsciiGeometry, GeometryError> {
        let mut source = AsciiSource::open(path)?;

        // two free-form description lines
        source.expect_line::<GeometryError>("the description header")?;
        source.expect_line::<GeometryError>("the description header")?;

        let node_line = source.expect_line::<GeometryError>("the node id header")?;
        let node_ids_stored = match node_line.strip_prefix("node id") {
            Some(mode) => ids_stored(mode),
            None => {
                return Err(super::BadHeader::new("node id".to_string(), node_line, path.to_path_buf()).into())
            }
        };

        let element_line = source.expect_line::<GeometryError>("the element id header")?;
        let element_ids_stored = match element_line.strip_prefix("element id") {
            Some(mode) => ids_stored(mode),
            None => {
                return Err(
                    super::BadHeader::new("element id".to_string(), element_line, path.to_path_buf()).into(),
                )
            }
        };

        Ok(AsciiGeometry {
            source,
            node_ids_stored,
            element_ids_stored,
        })
    }

    fn next_part(&mut self) -> Result<Option<Block>, GeometryError> {
        match self.source.next_line()? {
            None => return Ok(None),
            Some(line) if line == "part" => {}
            Some(line) => {
                return Err(super::BadHeader::new(
                    "part".to_string(),
                    line,
                    self.source.path().to_path_buf(),
                )
                .into())
            }
        }

        let id = self.source.read_usize::<GeometryError>("the part number")?;
        let name = self.source.expect_line::<GeometryError>("the part description")?;
        self.source.expect_keyword::<GeometryError>("coordinates")?;

        let n = self.source.read_usize::<GeometryError>("the point count")?;
        if self.node_ids_stored {
            self.source.read_i32s::<GeometryError>(n, "node ids")?;
        }
        let x = self.source.read_f32s::<GeometryError>(n, "x coordinates")?;
        let y = self.source.read_f32s::<GeometryError>(n, "y coordinates")?;
        let z = self.source.read_f32s::<GeometryError>(n, "z coordinates")?;
        self.source.expect_drained::<GeometryError>("coordinates")?;

        let points = build_points(x, y, z);
        let mut cells = Vec::new();

        loop {
            let label = match self.source.peek_line()? {
                None => break,
                Some("part") => break,
                Some(label) => label.to_string(),
            };
            self.source.next_line()?;

            let kind = ElementKind::from_label(&label)
                .ok_or_else(|| UnknownElement::new(label, id))?;

            let count = self.source.read_usize::<GeometryError>("the element count")?;
            if self.element_ids_stored {
                self.source.read_i32s::<GeometryError>(count, "element ids")?;
            }
            let raw = self
                .source
                .read_i32s::<GeometryError>(count * kind.node_count(), "connectivity")?;
            self.source.expect_drained::<GeometryError>("connectivity")?;

            build_cells(id, kind, count, &raw, points.len(), &mut cells)?;
        }

        Ok(Some(Block {
            id,
            name,
            points,
            cells,
        }))
    }
}

pub(crate) struct BinaryGeometry {
    source: BinarySource,
    node_ids_stored: bool,
    element_ids_stored: bool,
}

impl BinaryGeometry {
    fn open(path: &Path) -> Result<BinaryGeometry, GeometryError> {
        let mut source = BinarySource::open(path)?;

        source.expect_keyword::<GeometryError>("C Binary")?;
        source.expect_record::<GeometryError>("the description header")?;
        source.expect_record::<GeometryError>("the description header")?;

        let node_line = source.expect_record::<GeometryError>("the node id header")?;
        let node_ids_stored = match node_line.strip_prefix("node id") {
            Some(mode) => ids_stored(mode),
            None => {
                return Err(super::BadHeader::new("node id".to_string(), node_line, path.to_path_buf()).into())
            }
        };

        let element_line = source.expect_record::<GeometryError>("the element id header")?;
        let element_ids_stored = match element_line.strip_prefix("element id") {
            Some(mode) => ids_stored(mode),
            None => {
                return Err(
                    super::BadHeader::new("element id".to_string(), element_line, path.to_path_buf()).into(),
                )
            }
        };

        Ok(BinaryGeometry {
            source,
            node_ids_stored,
            element_ids_stored,
        })
    }

    fn next_part(&mut self) -> Result<Option<Block>, GeometryError> {
        match self.source.next_record::<GeometryError>("a part record")? {
            None => return Ok(None),
            Some(record) if record == "part" => {}
            Some(record) => {
                return Err(super::BadHeader::new(
                    "part".to_string(),
                    record,
                    self.source.path().to_path_buf(),
                )
                .into())
            }
        }

        let id = self.source.read_i32::<GeometryError>("the part number")? as usize;
        let name = self.source.expect_record::<GeometryError>("the part description")?;
        self.source.expect_keyword::<GeometryError>("coordinates")?;

        let n = self.source.read_i32::<GeometryError>("the point count")? as usize;
        if self.node_ids_stored {
            self.source.read_i32s::<GeometryError>(n, "node ids")?;
        }
        let x = self.source.read_f32s::<GeometryError>(n, "x coordinates")?;
        let y = self.source.read_f32s::<GeometryError>(n, "y coordinates")?;
        let z = self.source.read_f32s::<GeometryError>(n, "z coordinates")?;

        let points = build_points(x, y, z);
        let mut cells = Vec::new();

        loop {
            let label = match self.source.peek_record::<GeometryError>("an element section")? {
                None => break,
                Some("part") => break,
                Some(label) => label.to_string(),
            };
            self.source.next_record::<GeometryError>("an element section")?;

            let kind = ElementKind::from_label(&label)
                .ok_or_else(|| UnknownElement::new(label, id))?;

            let count = self.source.read_i32::<GeometryError>("the element count")? as usize;
            if self.element_ids_stored {
                self.source.read_i32s::<GeometryError>(count, "element ids")?;
            }
            let raw = self
                .source
                .read_i32s::<GeometryError>(count * kind.node_count(), "connectivity")?;

            build_cells(id, kind, count, &raw, points.len(), &mut cells)?;
        }

        Ok(Some(Block {
            id,
            name,
            points,
            cells,
        }))
    }
}
