//! clip region descriptors and the inside/outside/crosses predicate

use crate::mesh::Bounds;
use crate::prelude::*;

/// how a cell relates to a clip region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// every point of the cell is inside the region
    Inside,
    /// every point of the cell is outside the region
    Outside,
    /// the cell straddles the region boundary
    Crosses,
}

/// a region to keep. Membership is boundary inclusive for all three kinds:
/// a point exactly on a box face, on the plane, or on the sphere surface is
/// inside.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipRegion {
    Box(BoxRegion),
    Plane(PlaneRegion),
    Sphere(SphereRegion),
}

/// keep the inside of an axis aligned box
#[derive(Debug, Clone, PartialEq)]
pub struct BoxRegion {
    pub bounds: Bounds,
}

/// keep the half space `(p - origin) · normal >= 0`, or the opposite side
/// when `invert` is set
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneRegion {
    pub origin: Point3<f32>,
    pub normal: Vector3<f32>,
    pub invert: bool,
}

/// keep the inside of a sphere
#[derive(Debug, Clone, PartialEq)]
pub struct SphereRegion {
    pub center: Point3<f32>,
    pub radius: f32,
}

/// rejected region parameters
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InvalidRegion {
    #[error("box bounds are inverted on the {axis} axis: {min} > {max}")]
    InvertedBox { axis: char, min: f32, max: f32 },
    #[error("sphere radius must be positive, got {radius}")]
    NonPositiveRadius { radius: f32 },
    #[error("plane normal must have a nonzero length")]
    ZeroNormal,
}

impl ClipRegion {
    pub fn from_bounds(bounds: Bounds) -> Self {
        ClipRegion::Box(BoxRegion { bounds })
    }

    pub fn plane(origin: Point3<f32>, normal: Vector3<f32>, invert: bool) -> Self {
        ClipRegion::Plane(PlaneRegion {
            origin,
            normal,
            invert,
        })
    }

    pub fn sphere(center: Point3<f32>, radius: f32) -> Self {
        ClipRegion::Sphere(SphereRegion { center, radius })
    }

    pub fn validate(&self) -> Result<(), InvalidRegion> {
        match self {
            ClipRegion::Box(region) => {
                let b = &region.bounds;
                for (axis, name) in ['x', 'y', 'z'].into_iter().enumerate() {
                    if b.min[axis] > b.max[axis] {
                        return Err(InvalidRegion::InvertedBox {
                            axis: name,
                            min: b.min[axis],
                            max: b.max[axis],
                        });
                    }
                }
                Ok(())
            }
            ClipRegion::Plane(region) => {
                if region.normal.norm_squared() == 0.0 {
                    Err(InvalidRegion::ZeroNormal)
                } else {
                    Ok(())
                }
            }
            ClipRegion::Sphere(region) => {
                if region.radius > 0.0 {
                    Ok(())
                } else {
                    Err(InvalidRegion::NonPositiveRadius {
                        radius: region.radius,
                    })
                }
            }
        }
    }

    /// Signed inside measure of a point: positive inside, zero on the
    /// boundary, negative outside.
    ///
    /// For the plane this is the true signed distance (scaled by `|normal|`);
    /// for the box and sphere it is an implicit function with the right sign
    /// and a linear profile along any ray that crosses the boundary close to
    /// it, which is what the exact clip interpolates a cut parameter from.
    pub fn signed_distance(&self, p: &Point3<f32>) -> f32 {
        match self {
            ClipRegion::Box(region) => {
                let b = &region.bounds;
                let mut d = f32::INFINITY;
                for axis in 0..3 {
                    d = d.min(p[axis] - b.min[axis]);
                    d = d.min(b.max[axis] - p[axis]);
                }
                d
            }
            ClipRegion::Plane(region) => {
                let d = (p - region.origin).dot(&region.normal);
                if region.invert {
                    -d
                } else {
                    d
                }
            }
            ClipRegion::Sphere(region) => region.radius - (p - region.center).norm(),
        }
    }

    /// boundary inclusive membership
    pub fn contains(&self, p: &Point3<f32>) -> bool {
        self.signed_distance(p) >= 0.0
    }

    /// Classify a cell from the membership of its points.
    ///
    /// Pure: depends only on the point coordinates, so it may be evaluated
    /// in any order, including in parallel across blocks.
    pub fn classify(&self, points: &[Point3<f32>], cell: &Cell) -> Classification {
        let mut inside = 0;
        let mut outside = 0;

        for &id in &cell.nodes {
            if self.contains(&points[id as usize]) {
                inside += 1;
            } else {
                outside += 1;
            }
        }

        if outside == 0 {
            Classification::Inside
        } else if inside == 0 {
            Classification::Outside
        } else {
            Classification::Crosses
        }
    }

    /// The bounding box of the region, used by the prefilter. A half space
    /// is unbounded so planes return `None` and are never prefiltered.
    pub fn bounding_box(&self) -> Option<Bounds> {
        match self {
            ClipRegion::Box(region) => Some(region.bounds),
            ClipRegion::Plane(_) => None,
            ClipRegion::Sphere(region) => {
                let r = Vector3::new(region.radius, region.radius, region.radius);
                Some(Bounds::new(region.center - r, region.center + r))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::NodeIds;

    fn unit_box() -> ClipRegion {
        ClipRegion::from_bounds(Bounds::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        ))
    }

    #[test]
    fn box_membership_is_boundary_inclusive() {
        let region = unit_box();

        assert!(region.contains(&Point3::new(0.0, 0.0, 0.0)));
        assert!(region.contains(&Point3::new(1.0, 0.0, 0.0)));
        assert!(region.contains(&Point3::new(1.0, 1.0, 1.0)));
        assert!(!region.contains(&Point3::new(1.0 + 1e-4, 0.0, 0.0)));
    }

    #[test]
    fn plane_membership_and_invert() {
        let normal = Vector3::new(1.0, 0.0, 0.0);
        let keep_positive = ClipRegion::plane(Point3::origin(), normal, false);
        let keep_negative = ClipRegion::plane(Point3::origin(), normal, true);

        let above = Point3::new(2.0, 0.0, 0.0);
        let below = Point3::new(-2.0, 0.0, 0.0);
        let on = Point3::new(0.0, 5.0, -3.0);

        assert!(keep_positive.contains(&above));
        assert!(!keep_positive.contains(&below));
        assert!(keep_negative.contains(&below));
        assert!(!keep_negative.contains(&above));

        // the boundary belongs to both half spaces
        assert!(keep_positive.contains(&on));
        assert!(keep_negative.contains(&on));
    }

    #[test]
    fn sphere_surface_is_inside() {
        let region = ClipRegion::sphere(Point3::origin(), 2.0);

        assert!(region.contains(&Point3::new(2.0, 0.0, 0.0)));
        assert!(region.contains(&Point3::new(0.0, 0.0, 0.0)));
        assert!(!region.contains(&Point3::new(0.0, 2.001, 0.0)));
    }

    #[test]
    fn zero_radius_is_rejected() {
        let region = ClipRegion::sphere(Point3::origin(), 0.0);
        assert_eq!(
            region.validate(),
            Err(InvalidRegion::NonPositiveRadius { radius: 0.0 })
        );
    }

    #[test]
    fn inverted_box_is_rejected() {
        let region = ClipRegion::from_bounds(Bounds::new(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 1.0, 1.0),
        ));
        assert!(matches!(
            region.validate(),
            Err(InvalidRegion::InvertedBox { axis: 'x', .. })
        ));
    }

    #[test]
    fn cell_classification() {
        let region = unit_box();
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ];

        let inside = Cell::new(ElementKind::Tria3, NodeIds::from_slice(&[0, 1, 0]));
        let outside = Cell::new(ElementKind::Tria3, NodeIds::from_slice(&[2, 3, 2]));
        let crossing = Cell::new(ElementKind::Tria3, NodeIds::from_slice(&[0, 1, 2]));

        assert_eq!(region.classify(&points, &inside), Classification::Inside);
        assert_eq!(region.classify(&points, &outside), Classification::Outside);
        assert_eq!(region.classify(&points, &crossing), Classification::Crosses);
    }

    #[test]
    fn plane_has_no_bounding_box() {
        let plane = ClipRegion::plane(Point3::origin(), Vector3::x(), false);
        assert!(plane.bounding_box().is_none());

        let sphere = ClipRegion::sphere(Point3::new(1.0, 1.0, 1.0), 1.0);
        let bb = sphere.bounding_box().unwrap();
        assert_eq!(bb.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bb.max, Point3::new(2.0, 2.0, 2.0));
    }
}
