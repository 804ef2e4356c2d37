//! end-to-end clip scenarios over written-out cases

mod common;

use common::{base_config, grid_block, pressure_at, temp_dir, write_case_ascii};

use enclip::config::RegionKind;
use enclip::nalgebra::Point3;
use enclip::region::InvalidRegion;
use enclip::{ClipEngine, DatasetReader, Error, SequentialEngine};

/// 10x10x10 unit-spaced grid centered at the origin
fn centered_grid_case(dir: &std::path::Path) {
    write_case_ascii(dir, "grid", &[grid_block(1, 10, -5.0, 1.0)]);
}

#[test]
fn unit_box_keeps_the_center_subgrid() {
    let dir = temp_dir("unit_box_subgrid");
    centered_grid_case(&dir);

    let mut config = base_config(RegionKind::Box);
    config.bounds = Some([-1.0, 1.0, -1.0, 1.0, -1.0, 1.0]);
    config.streaming = true;

    let summary = SequentialEngine
        .run(&dir.join("grid.encas"), &config, &dir.join("out"), "clipped")
        .unwrap();

    // the box faces align with the grid: cells touching the box from
    // outside keep only a zero-volume face and vanish, leaving exactly the
    // 2x2x2 sub-grid
    assert_eq!(summary.blocks_out, 1);
    assert_eq!(summary.cells_out, 8);
    assert_eq!(summary.points_out, 27);

    let output = DatasetReader::open(&dir.join("out/clipped.encas"))
        .unwrap()
        .load()
        .unwrap();
    let block = &output.blocks[0];

    // all eight corners of the box are retained
    for x in [-1.0f32, 1.0] {
        for y in [-1.0f32, 1.0] {
            for z in [-1.0f32, 1.0] {
                let corner = Point3::new(x, y, z);
                assert!(
                    block.block.points.contains(&corner),
                    "missing corner {corner}"
                );
            }
        }
    }

    // field values ride along unchanged
    let pressure = &block.fields[0];
    for (idx, p) in block.block.points.iter().enumerate() {
        assert_eq!(pressure.values[[idx, 0]], pressure_at(p));
    }
}

#[test]
fn half_space_discards_negative_x() {
    let dir = temp_dir("half_space");
    centered_grid_case(&dir);

    let mut config = base_config(RegionKind::Plane);
    config.origin = Some([0.0, 0.0, 0.0]);
    config.normal = Some([1.0, 0.0, 0.0]);

    let summary = SequentialEngine
        .run(&dir.join("grid.encas"), &config, &dir.join("out"), "clipped")
        .unwrap();
    assert!(summary.blocks_out == 1);

    let output = DatasetReader::open(&dir.join("out/clipped.encas"))
        .unwrap()
        .load()
        .unwrap();

    for p in &output.blocks[0].block.points {
        assert!(p.x >= 0.0, "point {p} is on the discarded side");
    }
}

#[test]
fn exact_box_clip_stays_inside_the_box() {
    let dir = temp_dir("exact_containment");
    centered_grid_case(&dir);

    // offset bounds so cell faces do not align and cells get split
    let mut config = base_config(RegionKind::Box);
    config.bounds = Some([-1.5, 1.5, -1.5, 1.5, -1.5, 1.5]);

    let summary = SequentialEngine
        .run(&dir.join("grid.encas"), &config, &dir.join("out"), "clipped")
        .unwrap();
    assert!(summary.crossing_cells > 0);

    let output = DatasetReader::open(&dir.join("out/clipped.encas"))
        .unwrap()
        .load()
        .unwrap();

    for p in &output.blocks[0].block.points {
        for axis in 0..3 {
            assert!(
                p[axis] >= -1.5 - 1e-4 && p[axis] <= 1.5 + 1e-4,
                "point {p} escapes the box"
            );
        }
    }
}

#[test]
fn crinkle_keeps_boundary_cells_whole() {
    let dir = temp_dir("crinkle_boundary");
    centered_grid_case(&dir);

    let mut config = base_config(RegionKind::Box);
    config.bounds = Some([-1.5, 1.5, -1.5, 1.5, -1.5, 1.5]);
    config.crinkle = true;

    let summary = SequentialEngine
        .run(&dir.join("grid.encas"), &config, &dir.join("out"), "clipped")
        .unwrap();

    // the 1.5 planes cut through the second ring of cells, so the crinkle
    // keeps a 4x4x4 neighborhood
    assert_eq!(summary.cells_out, 64);
    assert!(summary.crossing_cells > 0);

    let output = DatasetReader::open(&dir.join("out/clipped.encas"))
        .unwrap()
        .load()
        .unwrap();
    let block = &output.blocks[0];

    // crinkle synthesizes nothing: every output value is an input value
    let pressure = &block.fields[0];
    for (idx, p) in block.block.points.iter().enumerate() {
        assert_eq!(pressure.values[[idx, 0]], pressure_at(p));
    }
}

#[test]
fn zero_radius_sphere_is_rejected() {
    let dir = temp_dir("zero_radius");
    centered_grid_case(&dir);

    let mut config = base_config(RegionKind::Sphere);
    config.center = Some([0.0, 0.0, 0.0]);
    config.radius = Some(0.0);

    let err = SequentialEngine
        .run(&dir.join("grid.encas"), &config, &dir.join("out"), "clipped")
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Region(InvalidRegion::NonPositiveRadius { .. })
    ));
}

#[test]
fn region_outside_the_mesh_yields_an_empty_case() {
    let dir = temp_dir("empty_result");
    centered_grid_case(&dir);

    let mut config = base_config(RegionKind::Box);
    config.bounds = Some([100.0, 101.0, 100.0, 101.0, 100.0, 101.0]);

    let summary = SequentialEngine
        .run(&dir.join("grid.encas"), &config, &dir.join("out"), "clipped")
        .unwrap();

    assert!(summary.is_empty());
    assert_eq!(summary.blocks_out, 0);
    assert_eq!(summary.blocks_prefiltered, 1);

    // the output is a valid, zero-part case, not an error
    let output = DatasetReader::open(&dir.join("out/clipped.encas"))
        .unwrap()
        .load()
        .unwrap();
    assert!(output.blocks.is_empty());
}

#[test]
fn secondary_format_export() {
    let dir = temp_dir("secondary_format");
    centered_grid_case(&dir);

    let mut config = base_config(RegionKind::Box);
    config.bounds = Some([-1.0, 1.0, -1.0, 1.0, -1.0, 1.0]);
    config.export_secondary_format = true;

    SequentialEngine
        .run(&dir.join("grid.encas"), &config, &dir.join("out"), "clipped")
        .unwrap();

    let vtk = std::fs::read_to_string(dir.join("out/clipped.vtk")).unwrap();
    assert!(vtk.starts_with("# vtk DataFile"));
    assert!(vtk.contains("DATASET UNSTRUCTURED_GRID"));
    assert!(vtk.contains("POINTS 27 float"));
    assert!(vtk.contains("SCALARS pressure float 1"));
    assert!(vtk.contains("VECTORS velocity float"));
}
