//! legacy VTK dump of a clip result
//!
//! A single-file ASCII unstructured grid with every block merged, meant as a
//! secondary output for quick inspection in generic viewers. The EnSight
//! file set stays the primary result; this loses the block structure.

use crate::prelude::*;

use std::io::Write;

/// legacy VTK cell type ids for the supported elements
fn vtk_cell_type(kind: ElementKind) -> u8 {
    match kind {
        ElementKind::Tria3 => 5,
        ElementKind::Quad4 => 9,
        ElementKind::Tetra4 => 10,
        ElementKind::Hexa8 => 12,
        ElementKind::Penta6 => 13,
        ElementKind::Pyramid5 => 14,
    }
}

/// write `blocks` as one merged ASCII unstructured grid
pub fn write_legacy_vtk<W: Write>(mut writer: W, blocks: &[BlockData]) -> std::io::Result<()> {
    let total_points: usize = blocks.iter().map(|b| b.block.point_count()).sum();
    let total_cells: usize = blocks.iter().map(|b| b.block.cell_count()).sum();

    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "clip result")?;
    writeln!(writer, "ASCII")?;
    writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;

    writeln!(writer, "POINTS {total_points} float")?;
    for data in blocks {
        for p in &data.block.points {
            writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
        }
    }

    // connectivity with per-block point offsets applied
    let list_length: usize = blocks
        .iter()
        .flat_map(|b| b.block.cells.iter())
        .map(|cell| cell.nodes.len() + 1)
        .sum();

    writeln!(writer, "CELLS {total_cells} {list_length}")?;
    let mut offset = 0usize;
    for data in blocks {
        for cell in &data.block.cells {
            write!(writer, "{}", cell.nodes.len())?;
            for &id in &cell.nodes {
                write!(writer, " {}", id as usize + offset)?;
            }
            writeln!(writer)?;
        }
        offset += data.block.point_count();
    }

    writeln!(writer, "CELL_TYPES {total_cells}")?;
    for data in blocks {
        for cell in &data.block.cells {
            writeln!(writer, "{}", vtk_cell_type(cell.kind))?;
        }
    }

    // every block carries the same variables, so the field list of the
    // first block names the sections
    let specs: Vec<(String, Association, usize)> = blocks
        .first()
        .map(|data| {
            data.fields
                .iter()
                .map(|f| (f.name.clone(), f.association, f.components()))
                .collect()
        })
        .unwrap_or_default();

    for association in [Association::Node, Association::Element] {
        let relevant: Vec<_> = specs
            .iter()
            .filter(|(_, a, _)| *a == association)
            .collect();
        if relevant.is_empty() {
            continue;
        }

        match association {
            Association::Node => writeln!(writer, "POINT_DATA {total_points}")?,
            Association::Element => writeln!(writer, "CELL_DATA {total_cells}")?,
        }

        for (name, _, components) in relevant {
            if *components == 3 {
                writeln!(writer, "VECTORS {name} float")?;
            } else {
                writeln!(writer, "SCALARS {name} float 1")?;
                writeln!(writer, "LOOKUP_TABLE default")?;
            }

            for data in blocks {
                let field = data
                    .fields
                    .iter()
                    .find(|f| &f.name == name)
                    .expect("blocks share a field set");

                for row in field.values.rows() {
                    let mut first = true;
                    for value in row {
                        if !first {
                            write!(writer, " ")?;
                        }
                        write!(writer, "{value}")?;
                        first = false;
                    }
                    writeln!(writer)?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::NodeIds;
    use nalgebra::Point3;

    #[test]
    fn merged_grid_offsets_connectivity() {
        let block = |id: usize, shift: f32| BlockData {
            block: Block {
                id,
                name: "part".to_string(),
                points: vec![
                    Point3::new(shift, 0.0, 0.0),
                    Point3::new(shift + 1.0, 0.0, 0.0),
                    Point3::new(shift, 1.0, 0.0),
                ],
                cells: vec![Cell::new(
                    ElementKind::Tria3,
                    NodeIds::from_slice(&[0, 1, 2]),
                )],
            },
            fields: vec![Field::scalar_per_node("pressure", vec![0.0, 1.0, 2.0])],
        };

        let mut out = Vec::new();
        write_legacy_vtk(&mut out, &[block(1, 0.0), block(2, 5.0)]).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("POINTS 6 float"));
        assert!(text.contains("CELLS 2 8"));
        // second triangle references the offset point ids
        assert!(text.contains("3 3 4 5"));
        assert!(text.contains("SCALARS pressure float 1"));
    }
}
