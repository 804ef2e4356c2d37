//! value types for multi-block unstructured meshes
//!
//! An EnSight Gold model is a sequence of parts; each part carries its own
//! point numbering and a connectivity table grouped by element type. Here a
//! part is a [`Block`] and a part together with the variables declared on it
//! is a [`BlockData`].

use crate::prelude::*;

/// The element types this crate reads, clips, and writes.
///
/// These are the volume and surface elements the EnSight Gold geometry
/// format names `tria3`, `quad4`, `tetra4`, `pyramid5`, `penta6`, `hexa8`.
/// Higher-order (quadratic) and polyhedral elements are not handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Tria3,
    Quad4,
    Tetra4,
    Pyramid5,
    Penta6,
    Hexa8,
}

impl ElementKind {
    /// every kind, in the order element sections are emitted to geometry and
    /// per-element variable files
    pub const ALL: [ElementKind; 6] = [
        ElementKind::Tria3,
        ElementKind::Quad4,
        ElementKind::Tetra4,
        ElementKind::Pyramid5,
        ElementKind::Penta6,
        ElementKind::Hexa8,
    ];

    /// number of points a single element of this kind references
    pub fn node_count(&self) -> usize {
        match self {
            ElementKind::Tria3 => 3,
            ElementKind::Quad4 => 4,
            ElementKind::Tetra4 => 4,
            ElementKind::Pyramid5 => 5,
            ElementKind::Penta6 => 6,
            ElementKind::Hexa8 => 8,
        }
    }

    /// the element section label as it appears in a geometry file
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Tria3 => "tria3",
            ElementKind::Quad4 => "quad4",
            ElementKind::Tetra4 => "tetra4",
            ElementKind::Pyramid5 => "pyramid5",
            ElementKind::Penta6 => "penta6",
            ElementKind::Hexa8 => "hexa8",
        }
    }

    pub fn from_label(label: &str) -> Option<ElementKind> {
        let kind = match label {
            "tria3" => ElementKind::Tria3,
            "quad4" => ElementKind::Quad4,
            "tetra4" => ElementKind::Tetra4,
            "pyramid5" => ElementKind::Pyramid5,
            "penta6" => ElementKind::Penta6,
            "hexa8" => ElementKind::Hexa8,
            _ => return None,
        };
        Some(kind)
    }

    /// volume elements can be decomposed to tetrahedra for the exact clip;
    /// surface elements are split in-plane instead
    pub fn is_volume(&self) -> bool {
        matches!(
            self,
            ElementKind::Tetra4 | ElementKind::Pyramid5 | ElementKind::Penta6 | ElementKind::Hexa8
        )
    }
}

/// connectivity of a single cell. All supported kinds reference at most 8
/// points so the ids live inline
pub type NodeIds = SmallVec<[u32; 8]>;

/// one cell: an element type tag and the point ids it references, in
/// EnSight winding order
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub kind: ElementKind,
    pub nodes: NodeIds,
}

impl Cell {
    pub fn new(kind: ElementKind, nodes: NodeIds) -> Self {
        debug_assert_eq!(kind.node_count(), nodes.len());
        Self { kind, nodes }
    }
}

/// one part of a multi-block dataset, with its own point and cell numbering
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// the part number as it appears in the geometry file
    pub id: usize,
    /// the part description line
    pub name: String,
    pub points: Vec<Point3<f32>>,
    pub cells: Vec<Cell>,
}

impl Block {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// axis aligned bounds of the part, `None` if it has no points
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// index of the first cell referencing a point id outside this block,
    /// if any. The readers reject such files before they get here
    pub fn first_invalid_cell(&self) -> Option<usize> {
        let n = self.points.len() as u32;
        self.cells
            .iter()
            .position(|cell| cell.nodes.iter().any(|&id| id >= n))
    }

    /// Consecutive runs of cells of the same kind.
    ///
    /// For a block read from a file these mirror the element sections of the
    /// geometry part, which is the order per-element variable files follow.
    pub fn element_runs(&self) -> Vec<(ElementKind, std::ops::Range<usize>)> {
        let mut runs: Vec<(ElementKind, std::ops::Range<usize>)> = Vec::new();

        for (idx, cell) in self.cells.iter().enumerate() {
            match runs.last_mut() {
                Some((kind, range)) if *kind == cell.kind => range.end = idx + 1,
                _ => runs.push((cell.kind, idx..idx + 1)),
            }
        }

        runs
    }
}

/// a part and the variables attached to it, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct BlockData {
    pub block: Block,
    pub fields: Vec<Field>,
}

/// a whole multi-block dataset for one time step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub blocks: Vec<BlockData>,
}

impl Dataset {
    /// union of the bounds of every part
    pub fn bounds(&self) -> Option<Bounds> {
        self.blocks
            .iter()
            .filter_map(|b| b.block.bounds())
            .reduce(|a, b| a.union(&b))
    }

    pub fn total_points(&self) -> usize {
        self.blocks.iter().map(|b| b.block.point_count()).sum()
    }

    pub fn total_cells(&self) -> usize {
        self.blocks.iter().map(|b| b.block.cell_count()).sum()
    }
}

/// axis aligned box `[min, max]`, closed on every face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point3<f32>]) -> Option<Self> {
        let first = points.first()?;
        let mut out = Bounds::new(*first, *first);

        for p in &points[1..] {
            for axis in 0..3 {
                out.min[axis] = out.min[axis].min(p[axis]);
                out.max[axis] = out.max[axis].max(p[axis]);
            }
        }

        Some(out)
    }

    /// closed-interval overlap test. Touching faces count as overlapping,
    /// which keeps the prefilter conservative
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.max.x >= other.min.x
            && self.min.x <= other.max.x
            && self.max.y >= other.min.y
            && self.min.y <= other.max.y
            && self.max.z >= other.min.z
            && self.min.z <= other.max.z
    }

    pub fn contains(&self, p: &Point3<f32>) -> bool {
        (0..3).all(|axis| self.min[axis] <= p[axis] && p[axis] <= self.max[axis])
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut out = *self;
        for axis in 0..3 {
            out.min[axis] = out.min[axis].min(other.min[axis]);
            out.max[axis] = out.max[axis].max(other.max[axis]);
        }
        out
    }

    /// fraction of `self`'s volume that lies inside `other`, as an overlap
    /// indicator for status output. Zero-volume boxes report 0
    pub fn overlap_fraction(&self, other: &Bounds) -> f32 {
        let mut overlap = 1.0_f64;
        let mut volume = 1.0_f64;

        for axis in 0..3 {
            let extent = (self.max[axis] - self.min[axis]) as f64;
            let shared = (self.max[axis].min(other.max[axis])
                - self.min[axis].max(other.min[axis])) as f64;

            volume *= extent;
            overlap *= shared.max(0.0);
        }

        if volume > 0.0 {
            (overlap / volume) as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_from_points() {
        let points = vec![
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(-2.0, 3.0, 0.5),
            Point3::new(0.0, 0.0, -4.0),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min, Point3::new(-2.0, -1.0, -4.0));
        assert_eq!(bounds.max, Point3::new(1.0, 3.0, 0.5));

        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn touching_bounds_overlap() {
        let a = Bounds::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Bounds::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let c = Bounds::new(Point3::new(1.1, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn overlap_fraction_half() {
        let clip = Bounds::new(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let mesh = Bounds::new(Point3::new(0.0, 0.0, 0.0), Point3::new(5.0, 1.0, 1.0));

        approx::assert_relative_eq!(clip.overlap_fraction(&mesh), 0.5);
    }

    #[test]
    fn element_labels_round_trip() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(ElementKind::from_label("nsided"), None);
    }
}
