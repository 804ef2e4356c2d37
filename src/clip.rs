//! the crinkle and exact clip stages
//!
//! Both stages take one [`BlockData`], classify every cell against the
//! region, and produce a reduced block with every attached field re-keyed to
//! the new numbering. Nothing is mutated in place; the input block can be
//! dropped as soon as its outcome has been written.
//!
//! Output ids are assigned in input traversal order, skipping discarded
//! entities. Points synthesized by the exact stage are appended after the
//! surviving original points, in creation order.

use crate::mesh::NodeIds;
use crate::prelude::*;

use ndarray::Array2;
use rustc_hash::FxHashMap;

/// how cells crossing the region boundary are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMode {
    /// keep crossing cells whole. No points are synthesized and every
    /// output value is an input value; the boundary is jagged
    Crinkle,
    /// split crossing cells at the boundary. Volume cells are decomposed to
    /// tetrahedra and cut; node variables are interpolated to the cut points
    Exact,
}

/// what became of one block
#[derive(Debug, Clone)]
pub struct ClipOutcome {
    /// the reduced block, or `None` when no cell survived
    pub data: Option<BlockData>,
    /// old point id to new point id, `None` for discarded points
    pub point_map: Vec<Option<u32>>,
    pub stats: BlockStats,
}

/// per-block bookkeeping for the run summary
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockStats {
    pub block_id: usize,
    pub points_in: usize,
    pub points_out: usize,
    pub cells_in: usize,
    pub cells_out: usize,
    /// cells that straddled the region boundary
    pub crossing_cells: usize,
}

/// clip one block and carry its fields through the new numbering
pub fn clip_block(input: &BlockData, region: &ClipRegion, mode: ClipMode) -> ClipOutcome {
    match mode {
        ClipMode::Crinkle => crinkle(input, region),
        ClipMode::Exact => exact(input, region),
    }
}

/// contiguous new ids for the points flagged as used
fn assign_ids(used: &[bool]) -> Vec<Option<u32>> {
    let mut next = 0u32;
    used.iter()
        .map(|&keep| {
            if keep {
                let id = next;
                next += 1;
                Some(id)
            } else {
                None
            }
        })
        .collect()
}

/// pull the listed rows out of a field into a new value table
fn gather_rows(field: &Field, rows: &[usize]) -> Array2<f32> {
    let mut out = Array2::zeros((rows.len(), field.components()));
    for (new, &old) in rows.iter().enumerate() {
        out.row_mut(new).assign(&field.values.row(old));
    }
    out
}

fn crinkle(input: &BlockData, region: &ClipRegion) -> ClipOutcome {
    let block = &input.block;

    let mut kept = Vec::new();
    let mut crossing_cells = 0;

    for (idx, cell) in block.cells.iter().enumerate() {
        match region.classify(&block.points, cell) {
            Classification::Outside => {}
            Classification::Crosses => {
                crossing_cells += 1;
                kept.push(idx);
            }
            Classification::Inside => kept.push(idx),
        }
    }

    let mut stats = BlockStats {
        block_id: block.id,
        points_in: block.point_count(),
        cells_in: block.cell_count(),
        crossing_cells,
        ..BlockStats::default()
    };

    if kept.is_empty() {
        return ClipOutcome {
            data: None,
            point_map: vec![None; block.point_count()],
            stats,
        };
    }

    let mut used = vec![false; block.point_count()];
    for &idx in &kept {
        for &id in &block.cells[idx].nodes {
            used[id as usize] = true;
        }
    }

    let point_map = assign_ids(&used);
    let kept_points: Vec<usize> = (0..block.point_count()).filter(|&i| used[i]).collect();

    let points: Vec<Point3<f32>> = kept_points.iter().map(|&i| block.points[i]).collect();
    let cells: Vec<Cell> = kept
        .iter()
        .map(|&idx| {
            let cell = &block.cells[idx];
            let nodes = cell
                .nodes
                .iter()
                .map(|&id| point_map[id as usize].unwrap())
                .collect();
            Cell::new(cell.kind, nodes)
        })
        .collect();

    let fields = input
        .fields
        .iter()
        .map(|field| {
            let rows = match field.association {
                Association::Node => &kept_points,
                Association::Element => &kept,
            };
            Field::new(&field.name, field.association, gather_rows(field, rows))
        })
        .collect();

    stats.points_out = points.len();
    stats.cells_out = cells.len();

    ClipOutcome {
        data: Some(BlockData {
            block: Block {
                id: block.id,
                name: block.name.clone(),
                points,
                cells,
            },
            fields,
        }),
        point_map,
        stats,
    }
}

/// a node of an output cell before final numbering: either an original point
/// or a point synthesized on a cut edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRef {
    Old(u32),
    Cut(u32),
}

#[derive(Debug)]
struct OutCell {
    kind: ElementKind,
    nodes: SmallVec<[NodeRef; 8]>,
    /// input cell this came from, for element field carry-over
    parent: usize,
}

/// a point synthesized on the edge (a, b) at parameter `t` from a
#[derive(Debug, Clone, Copy)]
struct CutPoint {
    a: u32,
    b: u32,
    t: f32,
}

struct Splitter {
    /// signed inside measure per original point
    distances: Vec<f32>,
    /// cut points already created, keyed by the (lo, hi) edge they sit on
    edge_cuts: FxHashMap<(u32, u32), u32>,
    cut_points: Vec<CutPoint>,
    out_cells: Vec<OutCell>,
}

impl Splitter {
    fn new(block: &Block, region: &ClipRegion) -> Self {
        let distances = block
            .points
            .iter()
            .map(|p| region.signed_distance(p))
            .collect();

        Splitter {
            distances,
            edge_cuts: FxHashMap::default(),
            cut_points: Vec::new(),
            out_cells: Vec::new(),
        }
    }

    fn inside(&self, id: u32) -> bool {
        self.distances[id as usize] >= 0.0
    }

    /// The cut point on the edge (a, b), created on first use. The edge key
    /// is ordered so both windings of a shared edge get the same point.
    ///
    /// A cut landing on an endpoint (the endpoint sits exactly on the
    /// region boundary) snaps to that endpoint instead of synthesizing a
    /// coincident point; the degenerate cells this produces are dropped at
    /// emission.
    fn cut(&mut self, a: u32, b: u32) -> NodeRef {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };

        let d_lo = self.distances[lo as usize];
        let d_hi = self.distances[hi as usize];
        // one endpoint is kept and one is discarded, so the denominator is
        // nonzero
        let t = d_lo / (d_lo - d_hi);

        if t <= 0.0 {
            return NodeRef::Old(lo);
        }
        if t >= 1.0 {
            return NodeRef::Old(hi);
        }

        if let Some(&index) = self.edge_cuts.get(&(lo, hi)) {
            return NodeRef::Cut(index);
        }

        let index = self.cut_points.len() as u32;
        self.cut_points.push(CutPoint { a: lo, b: hi, t });
        self.edge_cuts.insert((lo, hi), index);
        NodeRef::Cut(index)
    }

    fn keep_whole(&mut self, cell: &Cell, parent: usize) {
        let nodes = cell.nodes.iter().map(|&id| NodeRef::Old(id)).collect();
        self.out_cells.push(OutCell {
            kind: cell.kind,
            nodes,
            parent,
        });
    }

    fn emit_tet(&mut self, nodes: [NodeRef; 4], parent: usize) {
        // a repeated node means a cut snapped to a boundary vertex and the
        // tet has no volume
        for i in 0..4 {
            for j in i + 1..4 {
                if nodes[i] == nodes[j] {
                    return;
                }
            }
        }

        self.out_cells.push(OutCell {
            kind: ElementKind::Tetra4,
            nodes: SmallVec::from_slice(&nodes),
            parent,
        });
    }

    /// keep the `d >= 0` side of one tetrahedron
    fn clip_tet(&mut self, tet: [u32; 4], parent: usize) {
        let mut ins: SmallVec<[u32; 4]> = SmallVec::new();
        let mut outs: SmallVec<[u32; 4]> = SmallVec::new();
        for &v in &tet {
            if self.inside(v) {
                ins.push(v);
            } else {
                outs.push(v);
            }
        }

        match ins.len() {
            0 => {}
            4 => {
                let nodes = [
                    NodeRef::Old(tet[0]),
                    NodeRef::Old(tet[1]),
                    NodeRef::Old(tet[2]),
                    NodeRef::Old(tet[3]),
                ];
                self.emit_tet(nodes, parent);
            }
            1 => {
                // a small tetrahedron at the surviving corner
                let a = ins[0];
                let p1 = self.cut(a, outs[0]);
                let p2 = self.cut(a, outs[1]);
                let p3 = self.cut(a, outs[2]);
                self.emit_tet([NodeRef::Old(a), p1, p2, p3], parent);
            }
            3 => {
                // a frustum: the base triangle plus the cuts toward the
                // discarded corner, split into three tetrahedra
                let (a, b, c) = (ins[0], ins[1], ins[2]);
                let d = outs[0];
                let pa = self.cut(a, d);
                let pb = self.cut(b, d);
                let pc = self.cut(c, d);

                self.emit_tet([NodeRef::Old(a), NodeRef::Old(b), NodeRef::Old(c), pa], parent);
                self.emit_tet([NodeRef::Old(b), NodeRef::Old(c), pa, pb], parent);
                self.emit_tet([NodeRef::Old(c), pa, pb, pc], parent);
            }
            2 => {
                // a wedge between the kept edge and the quad of cuts
                let (a, b) = (ins[0], ins[1]);
                let (c, d) = (outs[0], outs[1]);
                let ac = self.cut(a, c);
                let ad = self.cut(a, d);
                let bc = self.cut(b, c);
                let bd = self.cut(b, d);

                self.emit_tet([NodeRef::Old(a), ac, ad, NodeRef::Old(b)], parent);
                self.emit_tet([ac, ad, NodeRef::Old(b), bd], parent);
                self.emit_tet([ac, NodeRef::Old(b), bc, bd], parent);
            }
            _ => unreachable!(),
        }
    }

    /// keep the `d >= 0` side of one triangle, fan-triangulating the
    /// clipped polygon
    fn clip_tri(&mut self, tri: [u32; 3], parent: usize) {
        let mut polygon: SmallVec<[NodeRef; 4]> = SmallVec::new();

        for i in 0..3 {
            let j = (i + 1) % 3;
            let vi = tri[i];
            let vj = tri[j];

            if self.inside(vi) {
                polygon.push(NodeRef::Old(vi));
            }
            if self.inside(vi) != self.inside(vj) {
                polygon.push(self.cut(vi, vj));
            }
        }

        // cuts snapping to a vertex leave coincident polygon corners behind
        polygon.dedup();
        if polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }
        if polygon.len() < 3 {
            return;
        }

        for k in 1..polygon.len() - 1 {
            self.out_cells.push(OutCell {
                kind: ElementKind::Tria3,
                nodes: SmallVec::from_slice(&[polygon[0], polygon[k], polygon[k + 1]]),
                parent,
            });
        }
    }
}

/// fixed tetrahedral decompositions of the volume elements
fn tets_of(cell: &Cell) -> SmallVec<[[u32; 4]; 6]> {
    let n = &cell.nodes;
    let mut out = SmallVec::new();

    match cell.kind {
        ElementKind::Tetra4 => {
            out.push([n[0], n[1], n[2], n[3]]);
        }
        ElementKind::Pyramid5 => {
            out.push([n[0], n[1], n[2], n[4]]);
            out.push([n[0], n[2], n[3], n[4]]);
        }
        ElementKind::Penta6 => {
            out.push([n[0], n[1], n[2], n[3]]);
            out.push([n[1], n[2], n[3], n[4]]);
            out.push([n[2], n[3], n[4], n[5]]);
        }
        ElementKind::Hexa8 => {
            out.push([n[0], n[1], n[3], n[4]]);
            out.push([n[1], n[2], n[3], n[6]]);
            out.push([n[1], n[3], n[4], n[6]]);
            out.push([n[3], n[4], n[6], n[7]]);
            out.push([n[1], n[4], n[5], n[6]]);
        }
        ElementKind::Tria3 | ElementKind::Quad4 => unreachable!("surface element"),
    }

    out
}

fn tris_of(cell: &Cell) -> SmallVec<[[u32; 3]; 2]> {
    let n = &cell.nodes;
    let mut out = SmallVec::new();

    match cell.kind {
        ElementKind::Tria3 => {
            out.push([n[0], n[1], n[2]]);
        }
        ElementKind::Quad4 => {
            out.push([n[0], n[1], n[2]]);
            out.push([n[0], n[2], n[3]]);
        }
        _ => unreachable!("volume element"),
    }

    out
}

fn exact(input: &BlockData, region: &ClipRegion) -> ClipOutcome {
    let block = &input.block;
    let mut splitter = Splitter::new(block, region);
    let mut crossing_cells = 0;

    for (idx, cell) in block.cells.iter().enumerate() {
        match region.classify(&block.points, cell) {
            Classification::Outside => {}
            Classification::Inside => splitter.keep_whole(cell, idx),
            Classification::Crosses => {
                crossing_cells += 1;
                if cell.kind.is_volume() {
                    for tet in tets_of(cell) {
                        splitter.clip_tet(tet, idx);
                    }
                } else {
                    for tri in tris_of(cell) {
                        splitter.clip_tri(tri, idx);
                    }
                }
            }
        }
    }

    let mut stats = BlockStats {
        block_id: block.id,
        points_in: block.point_count(),
        cells_in: block.cell_count(),
        crossing_cells,
        ..BlockStats::default()
    };

    if splitter.out_cells.is_empty() {
        return ClipOutcome {
            data: None,
            point_map: vec![None; block.point_count()],
            stats,
        };
    }

    let mut used = vec![false; block.point_count()];
    for cell in &splitter.out_cells {
        for node in &cell.nodes {
            if let NodeRef::Old(id) = node {
                used[*id as usize] = true;
            }
        }
    }

    let point_map = assign_ids(&used);
    let kept_points: Vec<usize> = (0..block.point_count()).filter(|&i| used[i]).collect();
    let base = kept_points.len() as u32;

    let mut points: Vec<Point3<f32>> = kept_points.iter().map(|&i| block.points[i]).collect();
    points.extend(splitter.cut_points.iter().map(|cut| {
        let a = block.points[cut.a as usize];
        let b = block.points[cut.b as usize];
        a + (b - a) * cut.t
    }));

    let resolve = |node: &NodeRef| -> u32 {
        match node {
            NodeRef::Old(id) => point_map[*id as usize].unwrap(),
            NodeRef::Cut(index) => base + index,
        }
    };

    let cells: Vec<Cell> = splitter
        .out_cells
        .iter()
        .map(|cell| {
            let nodes: NodeIds = cell.nodes.iter().map(resolve).collect();
            Cell::new(cell.kind, nodes)
        })
        .collect();

    let parents: Vec<usize> = splitter.out_cells.iter().map(|cell| cell.parent).collect();

    let fields = input
        .fields
        .iter()
        .map(|field| {
            let values = match field.association {
                Association::Node => {
                    let mut values =
                        Array2::zeros((points.len(), field.components()));
                    for (new, &old) in kept_points.iter().enumerate() {
                        values.row_mut(new).assign(&field.values.row(old));
                    }
                    // cut points interpolate with the same parameter as the
                    // geometric cut
                    for (index, cut) in splitter.cut_points.iter().enumerate() {
                        let row = &field.values.row(cut.a as usize) * (1.0 - cut.t)
                            + &field.values.row(cut.b as usize) * cut.t;
                        values.row_mut(base as usize + index).assign(&row);
                    }
                    values
                }
                Association::Element => gather_rows(field, &parents),
            };
            Field::new(&field.name, field.association, values)
        })
        .collect();

    stats.points_out = points.len();
    stats.cells_out = cells.len();

    ClipOutcome {
        data: Some(BlockData {
            block: Block {
                id: block.id,
                name: block.name.clone(),
                points,
                cells,
            },
            fields,
        }),
        point_map,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Bounds;
    use approx::assert_relative_eq;

    /// two unit tetrahedra sharing the face at x = 0; the first lies in
    /// x <= 0, the second in x >= 0
    fn two_tets() -> BlockData {
        let points = vec![
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let cells = vec![
            Cell::new(ElementKind::Tetra4, NodeIds::from_slice(&[0, 1, 2, 3])),
            Cell::new(ElementKind::Tetra4, NodeIds::from_slice(&[4, 1, 2, 3])),
        ];

        let pressure = Field::scalar_per_node("pressure", vec![-1.0, 0.0, 0.0, 0.0, 1.0]);
        let marker = Field::scalar_per_element("marker", vec![10.0, 20.0]);

        BlockData {
            block: Block {
                id: 1,
                name: "two tets".to_string(),
                points,
                cells,
            },
            fields: vec![pressure, marker],
        }
    }

    fn half_space_x() -> ClipRegion {
        ClipRegion::plane(Point3::origin(), Vector3::x(), false)
    }

    #[test]
    fn crinkle_keeps_whole_cells() {
        let input = two_tets();
        // a plane at x = 0.5 crosses the second tet and excludes the first
        let region = ClipRegion::plane(Point3::new(0.5, 0.0, 0.0), Vector3::x(), false);

        let outcome = clip_block(&input, &region, ClipMode::Crinkle);
        let data = outcome.data.unwrap();

        assert_eq!(data.block.cell_count(), 1);
        assert_eq!(data.block.point_count(), 4);
        assert_eq!(outcome.stats.crossing_cells, 1);

        // the field rows moved with their points
        let pressure = &data.fields[0];
        for (old, new) in outcome.point_map.iter().enumerate() {
            if let Some(new) = new {
                assert_eq!(
                    pressure.values[[*new as usize, 0]],
                    input.fields[0].values[[old, 0]]
                );
            }
        }

        let marker = &data.fields[1];
        assert_eq!(marker.values[[0, 0]], 20.0);
    }

    #[test]
    fn exact_keeps_inside_cells_verbatim() {
        let input = two_tets();
        let outcome = clip_block(&input, &half_space_x(), ClipMode::Exact);
        let data = outcome.data.unwrap();

        // the first tet only reaches the plane with its base face, so its
        // kept region has no volume and vanishes; the second is entirely at
        // x >= 0 and stays whole
        assert_eq!(data.block.cell_count(), 1);
        assert_eq!(data.block.point_count(), 4);
        assert_eq!(outcome.stats.crossing_cells, 1);

        for p in &data.block.points {
            assert!(p.x >= 0.0);
        }
    }

    #[test]
    fn exact_interpolates_cut_values() {
        let input = two_tets();
        // plane at x = -0.5: cuts the first tet halfway along its edges to
        // the apex at x = -1
        let region = ClipRegion::plane(Point3::new(-0.5, 0.0, 0.0), Vector3::x(), false);

        let outcome = clip_block(&input, &region, ClipMode::Exact);
        let data = outcome.data.unwrap();
        let pressure = &data.fields[0];

        // every cut point sits at x = -0.5, halfway along an edge from the
        // apex (pressure -1) to a base corner (pressure 0)
        for (idx, p) in data.block.points.iter().enumerate() {
            if p.x == -0.5 {
                assert_relative_eq!(pressure.values[[idx, 0]], -0.5);
            }
        }

        // the cut produced new points beyond the originals
        assert!(data.block.point_count() > 5);
    }

    #[test]
    fn clip_is_idempotent() {
        let input = two_tets();
        let region = half_space_x();

        for mode in [ClipMode::Crinkle, ClipMode::Exact] {
            let first = clip_block(&input, &region, mode).data.unwrap();
            let second = clip_block(&first, &region, mode).data.unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn fully_outside_block_is_dropped() {
        let input = two_tets();
        let region = ClipRegion::from_bounds(Bounds::new(
            Point3::new(10.0, 10.0, 10.0),
            Point3::new(11.0, 11.0, 11.0),
        ));

        let outcome = clip_block(&input, &region, ClipMode::Exact);
        assert!(outcome.data.is_none());
        assert_eq!(outcome.stats.cells_out, 0);
        assert!(outcome.point_map.iter().all(Option::is_none));
    }

    #[test]
    fn surface_cells_are_split_in_plane() {
        let points = vec![
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ];
        let cells = vec![Cell::new(ElementKind::Quad4, NodeIds::from_slice(&[0, 1, 2, 3]))];
        let input = BlockData {
            block: Block {
                id: 1,
                name: "one quad".to_string(),
                points,
                cells,
            },
            fields: vec![],
        };

        let outcome = clip_block(&input, &half_space_x(), ClipMode::Exact);
        let data = outcome.data.unwrap();

        assert!(data
            .block
            .cells
            .iter()
            .all(|cell| cell.kind == ElementKind::Tria3));
        for p in &data.block.points {
            assert!(p.x >= 0.0);
            assert_eq!(p.z, 0.0);
        }
    }
}
