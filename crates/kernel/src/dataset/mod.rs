//! The shared intersection dataset of one Boolean operation.
//!
//! Holds an indexed view of every sub-shape of both operands (deduplicated by
//! geometric identity), the pave sets of touched edges, and the typed
//! interference lists. Built once per Boolean call and dropped wholesale when
//! the result has been assembled, which frees all intermediate bookkeeping in
//! one step.

pub mod interference;
pub mod pave;

pub use interference::{Interference, InterferenceKind, Locus};
pub use pave::{Pave, PaveBlock, PaveSet};

use std::collections::HashMap;

use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::transform::BoundingBox;
use crate::topology::brep::{EdgeId, EntityStore, FaceId, Vertex, VertexId};
use crate::topology::shape::Shape;
use crate::Tolerance;

/// Which operand a sub-shape came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandTag {
    A,
    B,
}

/// Store reference of an indexed sub-shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubShape {
    Vertex(VertexId),
    Edge(EdgeId),
    Face(FaceId),
}

/// Per-index bookkeeping for one sub-shape.
#[derive(Debug, Clone)]
pub struct ShapeInfo {
    pub sub_shape: SubShape,
    pub tolerance: f64,
    pub bbox: BoundingBox,
    pub from_a: bool,
    pub from_b: bool,
}

impl ShapeInfo {
    pub fn from_operand(&self, tag: OperandTag) -> bool {
        match tag {
            OperandTag::A => self.from_a,
            OperandTag::B => self.from_b,
        }
    }

    /// True for vertices created by the intersection stages themselves.
    pub fn is_new(&self) -> bool {
        !self.from_a && !self.from_b
    }
}

/// The intersection dataset.
#[derive(Debug, Default)]
pub struct IntersectionDataset {
    infos: Vec<ShapeInfo>,
    vertex_index: HashMap<VertexId, usize>,
    edge_index: HashMap<EdgeId, usize>,
    face_index: HashMap<FaceId, usize>,
    pave_sets: HashMap<usize, PaveSet>,
    interferences: Vec<Interference>,
    tol: Tolerance,
}

impl IntersectionDataset {
    /// Index every sub-shape of both operands exactly once.
    ///
    /// Sub-shapes are deduplicated by geometric identity within the merge
    /// tolerance, not by store key: a vertex of A coincident with a vertex of
    /// B gets a single index flagged as belonging to both operands.
    pub fn init(store: &EntityStore, a: &Shape, b: &Shape, tol: Tolerance) -> Self {
        let mut ds = Self {
            tol,
            ..Self::default()
        };
        ds.index_operand(store, a, OperandTag::A);
        ds.index_operand(store, b, OperandTag::B);
        ds
    }

    fn index_operand(&mut self, store: &EntityStore, shape: &Shape, tag: OperandTag) {
        for face_id in shape.faces(store) {
            self.index_face(store, face_id, tag);
        }
    }

    fn index_face(&mut self, store: &EntityStore, face_id: FaceId, tag: OperandTag) -> usize {
        if let Some(&idx) = self.face_index.get(&face_id) {
            self.mark(idx, tag);
            return idx;
        }
        // Index boundary edges (and through them, vertices) first, so that
        // lower-dimension sub-shapes always precede their owners.
        let face = &store.faces[face_id];
        let mut loop_ids = vec![face.outer_loop];
        loop_ids.extend(face.inner_loops.iter().copied());
        for loop_id in loop_ids {
            if !store.loops.contains_key(loop_id) {
                continue;
            }
            let edge_uses = store.loops[loop_id].edges.clone();
            for eu in edge_uses {
                self.index_edge(store, eu.edge, tag);
            }
        }

        if let Some(idx) = self.find_same_face(store, face_id) {
            self.face_index.insert(face_id, idx);
            self.mark(idx, tag);
            return idx;
        }

        let idx = self.push_info(ShapeInfo {
            sub_shape: SubShape::Face(face_id),
            tolerance: store.faces[face_id].tolerance,
            bbox: store.face_bounding_box(face_id),
            from_a: tag == OperandTag::A,
            from_b: tag == OperandTag::B,
        });
        self.face_index.insert(face_id, idx);
        idx
    }

    fn index_edge(&mut self, store: &EntityStore, edge_id: EdgeId, tag: OperandTag) -> usize {
        if let Some(&idx) = self.edge_index.get(&edge_id) {
            self.mark(idx, tag);
            return idx;
        }
        let edge = &store.edges[edge_id];
        self.index_vertex(store, edge.start_vertex, tag);
        self.index_vertex(store, edge.end_vertex, tag);

        if let Some(idx) = self.find_same_edge(store, edge_id) {
            self.edge_index.insert(edge_id, idx);
            self.mark(idx, tag);
            return idx;
        }

        let mut bb = BoundingBox::empty();
        bb.expand_to_include(&store.vertices[edge.start_vertex].point);
        bb.expand_to_include(&store.vertices[edge.end_vertex].point);
        bb.expand_to_include(&edge.curve.evaluate((edge.first + edge.last) * 0.5));

        let idx = self.push_info(ShapeInfo {
            sub_shape: SubShape::Edge(edge_id),
            tolerance: edge.tolerance,
            bbox: bb,
            from_a: tag == OperandTag::A,
            from_b: tag == OperandTag::B,
        });
        self.edge_index.insert(edge_id, idx);
        idx
    }

    fn index_vertex(&mut self, store: &EntityStore, vertex_id: VertexId, tag: OperandTag) -> usize {
        if let Some(&idx) = self.vertex_index.get(&vertex_id) {
            self.mark(idx, tag);
            return idx;
        }
        let point = store.vertices[vertex_id].point;

        if let Some(idx) = self.find_same_vertex(store, &point) {
            self.vertex_index.insert(vertex_id, idx);
            self.mark(idx, tag);
            return idx;
        }

        let mut bb = BoundingBox::empty();
        bb.expand_to_include(&point);
        let idx = self.push_info(ShapeInfo {
            sub_shape: SubShape::Vertex(vertex_id),
            tolerance: store.vertices[vertex_id].tolerance,
            bbox: bb,
            from_a: tag == OperandTag::A,
            from_b: tag == OperandTag::B,
        });
        self.vertex_index.insert(vertex_id, idx);
        idx
    }

    fn find_same_vertex(&self, store: &EntityStore, point: &Point3d) -> Option<usize> {
        let merge = self.tol.merge_distance();
        self.infos.iter().position(|info| match info.sub_shape {
            SubShape::Vertex(v) => store.vertices[v].point.distance_to(point) < merge,
            _ => false,
        })
    }

    fn find_same_edge(&self, store: &EntityStore, edge_id: EdgeId) -> Option<usize> {
        let merge = self.tol.merge_distance();
        let edge = &store.edges[edge_id];
        let ends = (
            store.vertices[edge.start_vertex].point,
            store.vertices[edge.end_vertex].point,
        );
        let mid = edge.curve.evaluate((edge.first + edge.last) * 0.5);
        self.infos.iter().position(|info| match info.sub_shape {
            SubShape::Edge(other_id) => {
                let other = &store.edges[other_id];
                let other_ends = (
                    store.vertices[other.start_vertex].point,
                    store.vertices[other.end_vertex].point,
                );
                let same_ends = (ends.0.distance_to(&other_ends.0) < merge
                    && ends.1.distance_to(&other_ends.1) < merge)
                    || (ends.0.distance_to(&other_ends.1) < merge
                        && ends.1.distance_to(&other_ends.0) < merge);
                let other_mid = other.curve.evaluate((other.first + other.last) * 0.5);
                same_ends && mid.distance_to(&other_mid) < merge
            }
            _ => false,
        })
    }

    fn find_same_face(&self, store: &EntityStore, face_id: FaceId) -> Option<usize> {
        let merge = self.tol.merge_distance();
        let face = &store.faces[face_id];
        let pts = store.face_points(face_id);
        self.infos.iter().position(|info| match info.sub_shape {
            SubShape::Face(other_id) => {
                let other = &store.faces[other_id];
                let same_surface = match (&face.surface, &other.surface) {
                    (Surface::Plane(p1), Surface::Plane(p2)) => {
                        p1.same_locus(p2, merge, self.tol.angular)
                    }
                    (Surface::Sphere(s1), Surface::Sphere(s2)) => {
                        s1.center.distance_to(&s2.center) < merge
                            && (s1.radius - s2.radius).abs() < merge
                    }
                    _ => false,
                };
                if !same_surface {
                    return false;
                }
                let other_pts = store.face_points(other_id);
                pts.len() == other_pts.len()
                    && pts.iter().all(|p| {
                        other_pts.iter().any(|q| p.distance_to(q) < merge)
                    })
            }
            _ => false,
        })
    }

    fn push_info(&mut self, info: ShapeInfo) -> usize {
        self.infos.push(info);
        self.infos.len() - 1
    }

    fn mark(&mut self, idx: usize, tag: OperandTag) {
        match tag {
            OperandTag::A => self.infos[idx].from_a = true,
            OperandTag::B => self.infos[idx].from_b = true,
        }
    }

    // ── Queries ────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn info(&self, idx: usize) -> &ShapeInfo {
        &self.infos[idx]
    }

    pub fn tolerance(&self) -> &Tolerance {
        &self.tol
    }

    pub fn vertices_of(&self, tag: OperandTag) -> Vec<usize> {
        self.filtered(tag, |s| matches!(s, SubShape::Vertex(_)))
    }

    pub fn edges_of(&self, tag: OperandTag) -> Vec<usize> {
        self.filtered(tag, |s| matches!(s, SubShape::Edge(_)))
    }

    pub fn faces_of(&self, tag: OperandTag) -> Vec<usize> {
        self.filtered(tag, |s| matches!(s, SubShape::Face(_)))
    }

    fn filtered(&self, tag: OperandTag, pred: impl Fn(&SubShape) -> bool) -> Vec<usize> {
        self.infos
            .iter()
            .enumerate()
            .filter(|(_, info)| info.from_operand(tag) && pred(&info.sub_shape))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn vertex_id(&self, idx: usize) -> Option<VertexId> {
        match self.infos[idx].sub_shape {
            SubShape::Vertex(v) => Some(v),
            _ => None,
        }
    }

    pub fn edge_id(&self, idx: usize) -> Option<EdgeId> {
        match self.infos[idx].sub_shape {
            SubShape::Edge(e) => Some(e),
            _ => None,
        }
    }

    pub fn face_id(&self, idx: usize) -> Option<FaceId> {
        match self.infos[idx].sub_shape {
            SubShape::Face(f) => Some(f),
            _ => None,
        }
    }

    pub fn index_of_vertex(&self, id: VertexId) -> Option<usize> {
        self.vertex_index.get(&id).copied()
    }

    pub fn index_of_edge(&self, id: EdgeId) -> Option<usize> {
        self.edge_index.get(&id).copied()
    }

    pub fn index_of_face(&self, id: FaceId) -> Option<usize> {
        self.face_index.get(&id).copied()
    }

    // ── New intersection vertices ──────────────────────────────────────────

    /// Register a vertex created by an intersection stage.
    ///
    /// Coincident points within the merge tolerance reuse the existing index
    /// (with its tolerance widened) rather than creating a duplicate.
    pub fn add_intersection_vertex(
        &mut self,
        store: &mut EntityStore,
        point: Point3d,
        tolerance: f64,
    ) -> usize {
        if let Some(idx) = self.find_same_vertex(store, &point) {
            self.infos[idx].tolerance = self.infos[idx].tolerance.max(tolerance);
            return idx;
        }
        let vertex_id = store.vertices.insert(Vertex { point, tolerance });
        let mut bb = BoundingBox::empty();
        bb.expand_to_include(&point);
        let idx = self.push_info(ShapeInfo {
            sub_shape: SubShape::Vertex(vertex_id),
            tolerance,
            bbox: bb,
            from_a: false,
            from_b: false,
        });
        self.vertex_index.insert(vertex_id, idx);
        idx
    }

    // ── Pave sets ──────────────────────────────────────────────────────────

    /// The pave set of an edge, created lazily with the edge's boundary paves.
    pub fn pave_set_mut(&mut self, store: &EntityStore, edge_idx: usize) -> &mut PaveSet {
        if !self.pave_sets.contains_key(&edge_idx) {
            let edge_id = self
                .edge_id(edge_idx)
                .expect("pave set requested for a non-edge index");
            let edge = &store.edges[edge_id];
            let start_idx = self.vertex_index[&edge.start_vertex];
            let end_idx = self.vertex_index[&edge.end_vertex];
            let set = PaveSet::new(
                edge_idx,
                Pave {
                    vertex: start_idx,
                    t: edge.first,
                    tolerance: self.infos[start_idx].tolerance,
                },
                Pave {
                    vertex: end_idx,
                    t: edge.last,
                    tolerance: self.infos[end_idx].tolerance,
                },
            );
            self.pave_sets.insert(edge_idx, set);
        }
        self.pave_sets.get_mut(&edge_idx).expect("just inserted")
    }

    pub fn pave_set(&self, edge_idx: usize) -> Option<&PaveSet> {
        self.pave_sets.get(&edge_idx)
    }

    /// Edges that acquired at least one interior pave.
    pub fn touched_edges(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .pave_sets
            .iter()
            .filter(|(_, set)| set.interior_count() > 0)
            .map(|(&idx, _)| idx)
            .collect();
        out.sort_unstable();
        out
    }

    // ── Interferences ──────────────────────────────────────────────────────

    /// Append an interference; a duplicate of the same kind over the same
    /// unordered pair is merged by widening its tolerance.
    pub fn add_interference(&mut self, rec: Interference) -> usize {
        if let Some(pos) = self
            .interferences
            .iter()
            .position(|r| r.kind == rec.kind && r.pair() == rec.pair())
        {
            let existing = &mut self.interferences[pos];
            existing.tolerance = existing.tolerance.max(rec.tolerance);
            return pos;
        }
        self.interferences.push(rec);
        self.interferences.len() - 1
    }

    pub fn interferences(&self) -> &[Interference] {
        &self.interferences
    }

    pub fn interferences_of(&self, kind: InterferenceKind) -> Vec<&Interference> {
        self.interferences
            .iter()
            .filter(|r| r.kind == kind)
            .collect()
    }

    /// True when any interference involves the given index.
    pub fn is_interfering(&self, idx: usize) -> bool {
        self.interferences.iter().any(|r| r.involves(idx))
    }

    /// Widen a sub-shape's tolerance (monotonic: never shrinks).
    pub fn widen_tolerance(&mut self, idx: usize, tolerance: f64) {
        let info = &mut self.infos[idx];
        info.tolerance = info.tolerance.max(tolerance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::make_box;

    #[test]
    fn box_pair_indexes_each_sub_shape_once() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(&mut store, 5.0, 0.0, 0.0, 6.0, 1.0, 1.0);
        let ds = IntersectionDataset::init(
            &store,
            &Shape::solid(a),
            &Shape::solid(b),
            Tolerance::default(),
        );
        // 8 + 12 + 6 per box, no shared geometry.
        assert_eq!(ds.len(), 52);
        assert_eq!(ds.vertices_of(OperandTag::A).len(), 8);
        assert_eq!(ds.edges_of(OperandTag::B).len(), 12);
        assert_eq!(ds.faces_of(OperandTag::A).len(), 6);
    }

    #[test]
    fn coincident_vertices_share_an_index() {
        let mut store = EntityStore::new();
        // Boxes sharing the x = 1 plane: the 4 corner vertices, the 4 edges
        // and the square face itself coincide geometrically.
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(&mut store, 1.0, 0.0, 0.0, 2.0, 1.0, 1.0);
        let ds = IntersectionDataset::init(
            &store,
            &Shape::solid(a),
            &Shape::solid(b),
            Tolerance::default(),
        );
        let shared: Vec<usize> = (0..ds.len())
            .filter(|&i| ds.info(i).from_a && ds.info(i).from_b)
            .collect();
        // 4 shared vertices + 4 shared edges + the coincident square face.
        assert_eq!(shared.len(), 9);
        assert_eq!(ds.vertices_of(OperandTag::A).len(), 8);
        assert_eq!(ds.len(), 2 * 26 - 9);
    }

    #[test]
    fn intersection_vertex_dedupes_within_tolerance() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(&mut store, 5.0, 0.0, 0.0, 6.0, 1.0, 1.0);
        let mut ds = IntersectionDataset::init(
            &store,
            &Shape::solid(a),
            &Shape::solid(b),
            Tolerance::default(),
        );
        let before = ds.len();
        let p = Point3d::new(0.5, 0.5, 0.5);
        let i1 = ds.add_intersection_vertex(&mut store, p, 1e-7);
        let i2 = ds.add_intersection_vertex(&mut store, Point3d::new(0.5 + 1e-9, 0.5, 0.5), 1e-6);
        assert_eq!(i1, i2);
        assert_eq!(ds.len(), before + 1);
        assert_eq!(ds.info(i1).tolerance, 1e-6);
        assert!(ds.info(i1).is_new());
    }

    #[test]
    fn duplicate_interference_is_merged_not_duplicated() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(&mut store, 5.0, 0.0, 0.0, 6.0, 1.0, 1.0);
        let mut ds = IntersectionDataset::init(
            &store,
            &Shape::solid(a),
            &Shape::solid(b),
            Tolerance::default(),
        );
        let rec = Interference::new(
            InterferenceKind::VV,
            2,
            7,
            Locus::Point(Point3d::ORIGIN),
            1e-7,
            1e-7,
            1e-7,
        );
        ds.add_interference(rec);
        // Same unordered pair, larger achieved tolerance.
        let rec2 = Interference::new(
            InterferenceKind::VV,
            7,
            2,
            Locus::Point(Point3d::ORIGIN),
            1e-5,
            1e-7,
            1e-7,
        );
        ds.add_interference(rec2);
        assert_eq!(ds.interferences().len(), 1);
        assert_eq!(ds.interferences()[0].tolerance, 1e-5);
    }

    #[test]
    fn pave_set_seeds_edge_boundaries() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 2.0, 1.0, 1.0);
        let b = make_box(&mut store, 5.0, 0.0, 0.0, 6.0, 1.0, 1.0);
        let mut ds = IntersectionDataset::init(
            &store,
            &Shape::solid(a),
            &Shape::solid(b),
            Tolerance::default(),
        );
        let edge_idx = ds.edges_of(OperandTag::A)[0];
        let edge_id = ds.edge_id(edge_idx).unwrap();
        let (first, last) = (store.edges[edge_id].first, store.edges[edge_id].last);
        let set = ds.pave_set_mut(&store, edge_idx);
        assert_eq!(set.paves().len(), 2);
        assert_eq!(set.paves()[0].t, first);
        assert_eq!(set.paves()[1].t, last);
        assert!(ds.touched_edges().is_empty());
    }
}
