//! writing EnSight Gold file sets
//!
//! [`CaseWriter`] owns one open file per output (geometry plus one per
//! variable) and appends one part to each per [`CaseWriter::write_block`]
//! call. In streaming mode a part is on disk before the next block is read,
//! which is what bounds peak memory; in buffered mode everything is written
//! in one pass at [`CaseWriter::finish`]. The manifest and the units
//! side-file are written last so a crashed run never leaves a manifest that
//! promises more than the data files hold.

mod format;
mod legacy_vtk;
mod metadata;

pub use format::Format;
pub use legacy_vtk::write_legacy_vtk;

use crate::case::VariableDecl;
use crate::prelude::*;

use std::fs::File;
use std::io::BufWriter;
use std::marker::PhantomData;

/// any failure while producing the output file set
#[derive(Debug, thiserror::Error, From)]
pub enum WriteError {
    #[error("{0}")]
    Create(CreateFailure),
    #[error("{0}")]
    Output(OutputFailure),
    #[error("{0}")]
    FieldMismatch(FieldMismatch),
    #[error("could not write the metadata side-file: {0}")]
    Metadata(quick_xml::Error),
    #[error("An io error occured: `{0}`")]
    Io(std::io::Error),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "could not create `{path:?}`: {source}")]
pub struct CreateFailure {
    path: PathBuf,
    source: std::io::Error,
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "write to `{path:?}` failed: {source}")]
pub struct OutputFailure {
    path: PathBuf,
    source: std::io::Error,
}

#[derive(From, Display, Debug, Constructor)]
#[display(
    fmt = "part {part}: field `{name}` does not match the declared variable set of this case"
)]
pub struct FieldMismatch {
    part: usize,
    name: String,
}

/// what one output variable looks like: the writer creates its file up
/// front and checks every block against it
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub association: Association,
    pub components: usize,
}

impl FieldSpec {
    /// the output variable set mirroring the input declarations
    pub fn from_variables(variables: &[VariableDecl]) -> Vec<FieldSpec> {
        variables
            .iter()
            .map(|decl| FieldSpec {
                name: decl.name.clone(),
                association: decl.association,
                components: decl.components,
            })
            .collect()
    }

    /// the variable set of an in-memory block
    pub fn from_block(data: &BlockData) -> Vec<FieldSpec> {
        data.fields
            .iter()
            .map(|field| FieldSpec {
                name: field.name.clone(),
                association: field.association,
                components: field.components(),
            })
            .collect()
    }

    /// variable file name: `<basename>.0_n.<name>` per node,
    /// `<basename>.0_e.<name>` per element, timestep 0
    pub fn filename(&self, basename: &str) -> String {
        format!(
            "{basename}.0{}{}",
            self.association.file_infix(),
            self.name
        )
    }

    /// the manifest line declaring this variable
    fn manifest_line(&self, basename: &str) -> String {
        let kind = if self.components == 3 {
            "vector"
        } else {
            "scalar"
        };
        format!(
            "{kind} per {}: {} {}",
            self.association.manifest_label(),
            self.name,
            self.filename(basename)
        )
    }
}

/// whether parts go to disk as they arrive or in one pass at the end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// hold every block and write at `finish`; one pass over the output
    /// files, memory proportional to the clip result
    Buffered,
    /// write each block as it arrives and drop it; memory proportional to
    /// the largest single block
    Streaming,
}

/// writes one EnSight Gold case: geometry, one file per variable, the
/// manifest, and the units side-file
pub struct CaseWriter<F> {
    directory: PathBuf,
    basename: String,
    specs: Vec<FieldSpec>,
    mode: WriteMode,
    geometry: Output,
    variables: Vec<Output>,
    pending: Vec<BlockData>,
    parts_written: usize,
    _encoding: PhantomData<F>,
}

/// a file plus its path for error context
struct Output {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Output {
    fn create(path: PathBuf) -> Result<Output, WriteError> {
        let file =
            File::create(&path).map_err(|source| CreateFailure::new(path.clone(), source))?;
        Ok(Output {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// run a write against this file, attaching the path on failure
    fn guard<T>(&mut self, op: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<T>) -> Result<T, WriteError> {
        op(&mut self.writer).map_err(|source| OutputFailure::new(self.path.clone(), source).into())
    }
}

impl<F: Format> CaseWriter<F> {
    /// Create the output directory and every data file, and write the file
    /// headers. The variable set is fixed here; every block written later
    /// must carry exactly these fields.
    pub fn create(
        directory: &Path,
        basename: &str,
        specs: Vec<FieldSpec>,
        mode: WriteMode,
    ) -> Result<CaseWriter<F>, WriteError> {
        std::fs::create_dir_all(directory)
            .map_err(|source| CreateFailure::new(directory.to_path_buf(), source))?;

        let mut geometry = Output::create(directory.join(format!("{basename}.0.geo")))?;
        geometry.guard(|w| {
            if let Some(record) = F::leading_record() {
                F::write_line(w, record)?;
            }
            F::write_line(w, "EnSight Gold geometry")?;
            F::write_line(w, "clipped with enclip")?;
            F::write_line(w, "node id assign")?;
            F::write_line(w, "element id assign")
        })?;

        let mut variables = Vec::with_capacity(specs.len());
        for spec in &specs {
            let mut output = Output::create(directory.join(spec.filename(basename)))?;
            output.guard(|w| match F::leading_record() {
                Some(record) => F::write_line(w, record),
                // ascii variable files lead with a free-form description
                None => F::write_line(w, &spec.name),
            })?;
            variables.push(output);
        }

        Ok(CaseWriter {
            directory: directory.to_path_buf(),
            basename: basename.to_string(),
            specs,
            mode,
            geometry,
            variables,
            pending: Vec::new(),
            parts_written: 0,
            _encoding: PhantomData,
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(format!("{}.encas", self.basename))
    }

    /// parts emitted to the data files so far; buffered parts count once
    /// they are written at `finish`
    pub fn parts_written(&self) -> usize {
        self.parts_written
    }

    /// Append one block to every output file (streaming) or queue it
    /// (buffered). Fields must match the writer's variable set exactly;
    /// a partially attached variable is a bug upstream, never something to
    /// paper over in the output.
    pub fn write_block(&mut self, data: BlockData) -> Result<(), WriteError> {
        self.check_fields(&data)?;

        match self.mode {
            WriteMode::Streaming => self.emit(&data),
            WriteMode::Buffered => {
                self.pending.push(data);
                Ok(())
            }
        }
    }

    /// write any buffered parts, then the manifest and the units side-file
    pub fn finish(mut self) -> Result<(), WriteError> {
        for data in std::mem::take(&mut self.pending) {
            self.emit(&data)?;
        }

        self.geometry.guard(|w| w.flush())?;
        for output in &mut self.variables {
            output.guard(|w| w.flush())?;
        }

        self.write_manifest()?;
        self.write_sidecar()?;

        Ok(())
    }

    fn check_fields(&self, data: &BlockData) -> Result<(), WriteError> {
        let block = &data.block;

        if data.fields.len() != self.specs.len() {
            let name = self
                .specs
                .get(data.fields.len())
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "<extra field>".to_string());
            return Err(FieldMismatch::new(block.id, name).into());
        }

        for (spec, field) in self.specs.iter().zip(&data.fields) {
            let entities = match spec.association {
                Association::Node => block.point_count(),
                Association::Element => block.cell_count(),
            };

            let matches = field.name == spec.name
                && field.association == spec.association
                && field.components() == spec.components
                && field.entity_count() == entities;

            if !matches {
                return Err(FieldMismatch::new(block.id, spec.name.clone()).into());
            }
        }

        Ok(())
    }

    fn emit(&mut self, data: &BlockData) -> Result<(), WriteError> {
        let groups = grouped_cells(&data.block);

        self.geometry
            .guard(|w| geometry_part::<F, _>(w, &data.block, &groups))?;

        for ((spec, field), output) in self
            .specs
            .iter()
            .zip(&data.fields)
            .zip(&mut self.variables)
        {
            output.guard(|w| variable_part::<F, _>(w, &data.block, spec, field, &groups))?;
        }

        self.parts_written += 1;
        Ok(())
    }

    fn write_manifest(&self) -> Result<(), WriteError> {
        let path = self.manifest_path();
        let mut content = String::new();

        content.push_str("FORMAT\n");
        content.push_str("type: ensight gold\n");
        content.push('\n');
        content.push_str("GEOMETRY\n");
        content.push_str(&format!("model: {}.0.geo\n", self.basename));
        content.push('\n');
        content.push_str("VARIABLE\n");
        for spec in &self.specs {
            content.push_str(&spec.manifest_line(&self.basename));
            content.push('\n');
        }

        std::fs::write(&path, content).map_err(|source| OutputFailure::new(path, source).into())
    }

    fn write_sidecar(&self) -> Result<(), WriteError> {
        let path = self.directory.join(format!("{}.xml", self.basename));
        let file = File::create(&path).map_err(|source| CreateFailure::new(path, source))?;
        metadata::write_units_sidecar(BufWriter::new(file), &self.specs)?;
        Ok(())
    }
}

/// output element sections: every kind present in the block, cells in
/// traversal order within their section
fn grouped_cells(block: &Block) -> Vec<(ElementKind, Vec<usize>)> {
    ElementKind::ALL
        .iter()
        .filter_map(|&kind| {
            let indices: Vec<usize> = block
                .cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.kind == kind)
                .map(|(idx, _)| idx)
                .collect();
            (!indices.is_empty()).then_some((kind, indices))
        })
        .collect()
}

fn geometry_part<F: Format, W: std::io::Write>(
    writer: &mut W,
    block: &Block,
    groups: &[(ElementKind, Vec<usize>)],
) -> std::io::Result<()> {
    F::write_line(writer, "part")?;
    F::write_int(writer, block.id as i32)?;
    F::write_line(writer, &block.name)?;
    F::write_line(writer, "coordinates")?;
    F::write_int(writer, block.point_count() as i32)?;

    for axis in 0..3 {
        F::write_f32s(writer, block.points.iter().map(|p| p[axis]))?;
    }

    for (kind, indices) in groups {
        F::write_line(writer, kind.label())?;
        F::write_int(writer, indices.len() as i32)?;
        for &idx in indices {
            // connectivity is 1-based on disk
            F::write_connectivity(
                writer,
                block.cells[idx].nodes.iter().map(|&id| id as i32 + 1),
            )?;
        }
    }

    Ok(())
}

fn variable_part<F: Format, W: std::io::Write>(
    writer: &mut W,
    block: &Block,
    spec: &FieldSpec,
    field: &Field,
    groups: &[(ElementKind, Vec<usize>)],
) -> std::io::Result<()> {
    F::write_line(writer, "part")?;
    F::write_int(writer, block.id as i32)?;

    match spec.association {
        Association::Node => {
            F::write_line(writer, "coordinates")?;
            // values are component-major per part
            for c in 0..spec.components {
                F::write_f32s(writer, field.values.column(c).iter().copied())?;
            }
        }
        Association::Element => {
            // sections mirror the geometry part
            for (kind, indices) in groups {
                F::write_line(writer, kind.label())?;
                for c in 0..spec.components {
                    F::write_f32s(
                        writer,
                        indices.iter().map(|&idx| field.values[[idx, c]]),
                    )?;
                }
            }
        }
    }

    Ok(())
}
