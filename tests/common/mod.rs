//! shared fixtures for the integration tests
#![allow(dead_code)]

use enclip::mesh::NodeIds;
use enclip::nalgebra::Point3;
use enclip::write::{CaseWriter, FieldSpec, WriteMode};
use enclip::{Ascii, Binary, Block, BlockData, Cell, ClipConfig, ElementKind, Field};

use std::path::{Path, PathBuf};

/// an injective scalar over the grid points, so misaligned field rows are
/// always caught
pub fn pressure_at(p: &Point3<f32>) -> f32 {
    100.0 * p.x + 10.0 * p.y + p.z
}

/// a `cells_per_axis`³ hexahedral grid block starting at `origin` with the
/// given spacing, carrying a node scalar, a node vector, and an element
/// scalar
pub fn grid_block(id: usize, cells_per_axis: usize, origin: f32, spacing: f32) -> BlockData {
    let n = cells_per_axis;
    let points_per_axis = n + 1;

    let mut points = Vec::with_capacity(points_per_axis.pow(3));
    for k in 0..points_per_axis {
        for j in 0..points_per_axis {
            for i in 0..points_per_axis {
                points.push(Point3::new(
                    origin + i as f32 * spacing,
                    origin + j as f32 * spacing,
                    origin + k as f32 * spacing,
                ));
            }
        }
    }

    let point_id = |i: usize, j: usize, k: usize| -> u32 {
        ((k * points_per_axis + j) * points_per_axis + i) as u32
    };

    let mut cells = Vec::with_capacity(n.pow(3));
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                cells.push(Cell::new(
                    ElementKind::Hexa8,
                    NodeIds::from_slice(&[
                        point_id(i, j, k),
                        point_id(i + 1, j, k),
                        point_id(i + 1, j + 1, k),
                        point_id(i, j + 1, k),
                        point_id(i, j, k + 1),
                        point_id(i + 1, j, k + 1),
                        point_id(i + 1, j + 1, k + 1),
                        point_id(i, j + 1, k + 1),
                    ]),
                ));
            }
        }
    }

    let pressure = Field::scalar_per_node("pressure", points.iter().map(pressure_at).collect());
    let velocity = Field::vector_per_node(
        "velocity",
        points.iter().flat_map(|p| [p.x, p.y, p.z]).collect(),
    );
    let marker =
        Field::scalar_per_element("cell_marker", (0..cells.len()).map(|i| i as f32).collect());

    BlockData {
        block: Block {
            id,
            name: format!("grid {id}"),
            points,
            cells,
        },
        fields: vec![pressure, velocity, marker],
    }
}

pub fn write_case_ascii(directory: &Path, basename: &str, blocks: &[BlockData]) {
    let specs = FieldSpec::from_block(&blocks[0]);
    let mut writer =
        CaseWriter::<Ascii>::create(directory, basename, specs, WriteMode::Buffered).unwrap();
    for block in blocks {
        writer.write_block(block.clone()).unwrap();
    }
    writer.finish().unwrap();
}

pub fn write_case_binary(directory: &Path, basename: &str, blocks: &[BlockData]) {
    let specs = FieldSpec::from_block(&blocks[0]);
    let mut writer =
        CaseWriter::<Binary>::create(directory, basename, specs, WriteMode::Buffered).unwrap();
    for block in blocks {
        writer.write_block(block.clone()).unwrap();
    }
    writer.finish().unwrap();
}

/// a fresh scratch directory under the system temp dir
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("enclip-tests-{}", std::process::id()))
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// a configuration with no region parameters set and the run flags at
/// their defaults, ascii output for easy inspection on failure
pub fn base_config(kind: enclip::config::RegionKind) -> ClipConfig {
    ClipConfig {
        kind,
        bounds: None,
        origin: None,
        normal: None,
        invert: false,
        center: None,
        radius: None,
        use_prefilter: true,
        crinkle: false,
        export_secondary_format: false,
        streaming: false,
        ascii: true,
    }
}
