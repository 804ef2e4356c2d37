//! the bounding-box prefilter
//!
//! A cheap first pass over each block: if the block's bounds do not overlap
//! the region's bounding box, no cell of the block can be inside or crossing
//! and the exact stage never has to hold it. The test is a conservative
//! over-approximation; it must never discard a block the exact stage would
//! have kept, so touching faces count as overlap and half spaces (which are
//! unbounded) always pass.

use crate::prelude::*;

/// `true` when `block` has to be handed to the exact stage
pub fn retain_block(block: &Block, region: &ClipRegion) -> bool {
    let region_box = match region.bounding_box() {
        Some(region_box) => region_box,
        // planes are unbounded, nothing can be ruled out
        None => return true,
    };

    match block.bounds() {
        Some(bounds) => bounds.overlaps(&region_box),
        // a block with no points has nothing to keep either way; let the
        // clip stage count it
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Bounds, NodeIds};
    use nalgebra::Point3;

    fn block_at(x: f32) -> Block {
        Block {
            id: 1,
            name: "probe".to_string(),
            points: vec![
                Point3::new(x, 0.0, 0.0),
                Point3::new(x + 1.0, 0.0, 0.0),
                Point3::new(x, 1.0, 1.0),
            ],
            cells: vec![Cell::new(
                ElementKind::Tria3,
                NodeIds::from_slice(&[0, 1, 2]),
            )],
        }
    }

    fn unit_box() -> ClipRegion {
        ClipRegion::from_bounds(Bounds::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        ))
    }

    #[test]
    fn distant_blocks_are_discarded() {
        assert!(retain_block(&block_at(0.0), &unit_box()));
        assert!(!retain_block(&block_at(5.0), &unit_box()));

        // touching the box face exactly must be retained
        assert!(retain_block(&block_at(1.0), &unit_box()));
    }

    #[test]
    fn plane_regions_are_never_prefiltered() {
        let plane = ClipRegion::plane(Point3::origin(), nalgebra::Vector3::x(), false);
        assert!(retain_block(&block_at(-100.0), &plane));
    }

    #[test]
    fn sphere_bounding_box_is_used() {
        let sphere = ClipRegion::sphere(Point3::origin(), 2.0);
        assert!(retain_block(&block_at(0.5), &sphere));
        assert!(!retain_block(&block_at(2.5), &sphere));
    }
}
