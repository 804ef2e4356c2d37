//! the prefilter must never change a clip result, only skip work

mod common;

use common::{base_config, grid_block, temp_dir, write_case_ascii};

use enclip::config::RegionKind;
use enclip::{ClipEngine, DatasetReader, SequentialEngine};

/// four separated grid blocks; the region only reaches the first two
fn scattered_case(dir: &std::path::Path) {
    let blocks = vec![
        grid_block(1, 3, -1.5, 1.0),
        grid_block(2, 3, 4.0, 1.0),
        grid_block(3, 3, 20.0, 1.0),
        grid_block(4, 3, -30.0, 1.0),
    ];
    write_case_ascii(dir, "scattered", &blocks);
}

fn configs() -> Vec<(enclip::ClipConfig, &'static str)> {
    let mut box_config = base_config(RegionKind::Box);
    box_config.bounds = Some([-2.0, 5.0, -2.0, 5.0, -2.0, 5.0]);

    let mut sphere_config = base_config(RegionKind::Sphere);
    sphere_config.center = Some([0.0, 0.0, 0.0]);
    sphere_config.radius = Some(2.0);

    let mut plane_config = base_config(RegionKind::Plane);
    plane_config.origin = Some([1.0, 0.0, 0.0]);
    plane_config.normal = Some([-1.0, 0.5, 0.0]);

    vec![
        (box_config, "box"),
        (sphere_config, "sphere"),
        (plane_config, "plane"),
    ]
}

#[test]
fn prefiltered_results_match_unfiltered() {
    for (config, label) in configs() {
        for crinkle in [false, true] {
            let dir = temp_dir(&format!("soundness_{label}_{crinkle}"));
            scattered_case(&dir);
            let case = dir.join("scattered.encas");

            let mut with = config.clone();
            with.use_prefilter = true;
            with.crinkle = crinkle;

            let mut without = config.clone();
            without.use_prefilter = false;
            without.crinkle = crinkle;

            let summary_with = SequentialEngine
                .run(&case, &with, &dir.join("with"), "clipped")
                .unwrap();
            let summary_without = SequentialEngine
                .run(&case, &without, &dir.join("without"), "clipped")
                .unwrap();

            // the prefilter may only skip blocks the clip would have
            // discarded anyway
            assert_eq!(
                summary_with.blocks_out, summary_without.blocks_out,
                "{label} crinkle={crinkle}"
            );
            assert_eq!(summary_with.cells_out, summary_without.cells_out);

            let result_with = DatasetReader::open(&dir.join("with/clipped.encas"))
                .unwrap()
                .load()
                .unwrap();
            let result_without = DatasetReader::open(&dir.join("without/clipped.encas"))
                .unwrap()
                .load()
                .unwrap();

            assert_eq!(result_with, result_without, "{label} crinkle={crinkle}");
        }
    }
}

#[test]
fn prefilter_skips_distant_blocks() {
    let dir = temp_dir("prefilter_skips");
    scattered_case(&dir);

    let mut config = base_config(RegionKind::Sphere);
    config.center = Some([0.0, 0.0, 0.0]);
    config.radius = Some(3.0);

    let summary = SequentialEngine
        .run(
            &dir.join("scattered.encas"),
            &config,
            &dir.join("out"),
            "clipped",
        )
        .unwrap();

    // blocks 2 [4, 7], 3 [20, 23], and 4 [-30, -27] cannot reach the
    // sphere's bounding box [-3, 3]
    assert_eq!(summary.blocks_in, 4);
    assert_eq!(summary.blocks_prefiltered, 3);
    assert_eq!(summary.blocks_out, 1);
}
