use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::geometry::curves::Curve;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::transform::BoundingBox;
use crate::geometry::vector::Vec3;

// ─── Entity keys ────────────────────────────────────────────────────────────

new_key_type! {
    pub struct VertexId;
    pub struct EdgeId;
    pub struct LoopId;
    pub struct FaceId;
    pub struct ShellId;
    pub struct SolidId;
}

// ─── Topological entities ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub point: Point3d,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub curve: Curve,
    /// Parameter range on the curve, `first < last`.
    pub first: f64,
    pub last: f64,
    pub start_vertex: VertexId,
    pub end_vertex: VertexId,
    pub tolerance: f64,
}

/// One traversal of an edge inside a loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EdgeUse {
    pub edge: EdgeId,
    /// true when the loop walks the edge from `first` to `last`.
    pub forward: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loop {
    pub edges: Vec<EdgeUse>,
    pub face: FaceId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub surface: Surface,
    /// Empty key for closed surfaces without a boundary (full sphere).
    pub outer_loop: LoopId,
    pub inner_loops: Vec<LoopId>,
    /// true if the face normal agrees with the surface normal.
    pub same_sense: bool,
    pub shell: ShellId,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellKind {
    /// Outer boundary (normals point away from the material).
    Outer,
    /// Internal void (normals point into the cavity).
    Void,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shell {
    pub faces: Vec<FaceId>,
    pub kind: ShellKind,
    pub solid: SolidId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solid {
    pub shells: Vec<ShellId>,
}

// ─── Entity store ───────────────────────────────────────────────────────────

/// Arena storage for all topological entities.
///
/// Entities are shared by key; Boolean operations never mutate an input
/// entity in place — new topology gets new keys (copy-on-modify).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    pub vertices: SlotMap<VertexId, Vertex>,
    pub edges: SlotMap<EdgeId, Edge>,
    pub loops: SlotMap<LoopId, Loop>,
    pub faces: SlotMap<FaceId, Face>,
    pub shells: SlotMap<ShellId, Shell>,
    pub solids: SlotMap<SolidId, Solid>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered boundary vertices of a loop (start vertex of each edge use).
    pub fn loop_vertices(&self, loop_id: LoopId) -> Vec<VertexId> {
        let lp = &self.loops[loop_id];
        lp.edges
            .iter()
            .map(|eu| {
                let e = &self.edges[eu.edge];
                if eu.forward {
                    e.start_vertex
                } else {
                    e.end_vertex
                }
            })
            .collect()
    }

    /// Boundary points of a loop in traversal order.
    pub fn loop_points(&self, loop_id: LoopId) -> Vec<Point3d> {
        self.loop_vertices(loop_id)
            .into_iter()
            .map(|v| self.vertices[v].point)
            .collect()
    }

    /// Boundary points of a face's outer loop; empty for loop-less faces.
    pub fn face_points(&self, face_id: FaceId) -> Vec<Point3d> {
        let face = &self.faces[face_id];
        if self.loops.contains_key(face.outer_loop) {
            self.loop_points(face.outer_loop)
        } else {
            Vec::new()
        }
    }

    pub fn face_normal(&self, face_id: FaceId, u: f64, v: f64) -> Vec3 {
        let face = &self.faces[face_id];
        let n = face.surface.normal_at(u, v);
        if face.same_sense {
            n
        } else {
            -n
        }
    }

    pub fn solid_faces(&self, solid_id: SolidId) -> Vec<FaceId> {
        let mut out = Vec::new();
        for &shell_id in &self.solids[solid_id].shells {
            out.extend(self.shells[shell_id].faces.iter().copied());
        }
        out
    }

    pub fn face_bounding_box(&self, face_id: FaceId) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        let face = &self.faces[face_id];
        for p in self.face_points(face_id) {
            bb.expand_to_include(&p);
        }
        if !bb.is_valid() {
            // Loop-less closed surface: bound it from the surface itself.
            if let Surface::Sphere(s) = &face.surface {
                let r = Vec3::new(s.radius, s.radius, s.radius);
                bb.expand_to_include(&(s.center - r));
                bb.expand_to_include(&(s.center + r));
            }
        }
        bb
    }

    pub fn solid_bounding_box(&self, solid_id: SolidId) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        for face_id in self.solid_faces(solid_id) {
            bb.merge(&self.face_bounding_box(face_id));
        }
        bb
    }

    /// Exact volume of a polyhedral solid by the divergence theorem.
    ///
    /// Loops must wind counter-clockwise seen from outside the material;
    /// void shells then contribute negatively without special casing.
    /// `None` when any face has no boundary polygon (curved closed faces).
    pub fn solid_volume(&self, solid_id: SolidId) -> Option<f64> {
        let mut six_v = 0.0;
        for face_id in self.solid_faces(solid_id) {
            let face = &self.faces[face_id];
            if !face.surface.is_planar() {
                return None;
            }
            let pts = self.face_points(face_id);
            if pts.len() < 3 {
                return None;
            }
            six_v += polygon_six_volume(&pts);
            for &inner in &face.inner_loops {
                six_v += polygon_six_volume(&self.loop_points(inner));
            }
        }
        Some(six_v / 6.0)
    }
}

/// Fan-summed contribution of one planar polygon to 6x the enclosed volume.
fn polygon_six_volume(pts: &[Point3d]) -> f64 {
    let mut sum = 0.0;
    for i in 1..pts.len().saturating_sub(1) {
        let a = pts[0].to_vec3();
        let b = pts[i].to_vec3();
        let c = pts[i + 1].to_vec3();
        sum += a.dot(&b.cross(&c));
    }
    sum
}

// ─── Closed-shell audit ─────────────────────────────────────────────────────

/// A coordinate key that merges points within a fixed quantization grid,
/// used to match boundary edges across independently built faces.
pub fn point_key(p: &Point3d, grid: f64) -> (i64, i64, i64) {
    (
        (p.x / grid).round() as i64,
        (p.y / grid).round() as i64,
        (p.z / grid).round() as i64,
    )
}

/// Result of the boundary-closure audit over a set of faces.
#[derive(Debug, Clone)]
pub struct ClosureAudit {
    /// Boundary segments used by exactly one face.
    pub open_segments: usize,
    /// Boundary segments used by three or more faces.
    pub non_manifold_segments: usize,
}

impl ClosureAudit {
    pub fn is_closed(&self) -> bool {
        self.open_segments == 0 && self.non_manifold_segments == 0
    }
}

/// Count how often each undirected boundary segment is used by the faces.
/// A watertight two-manifold uses every segment exactly twice.
pub fn audit_closure(store: &EntityStore, faces: &[FaceId], grid: f64) -> ClosureAudit {
    let mut counts: HashMap<((i64, i64, i64), (i64, i64, i64)), usize> = HashMap::new();
    for &face_id in faces {
        let face = &store.faces[face_id];
        if !face.surface.is_planar() {
            continue;
        }
        let mut rings = vec![store.face_points(face_id)];
        for &inner in &face.inner_loops {
            rings.push(store.loop_points(inner));
        }
        for pts in rings {
            let n = pts.len();
            for i in 0..n {
                let a = point_key(&pts[i], grid);
                let b = point_key(&pts[(i + 1) % n], grid);
                let key = if a <= b { (a, b) } else { (b, a) };
                *counts.entry(key).or_insert(0) += 1;
            }
        }
    }
    let open_segments = counts.values().filter(|&&c| c == 1).count();
    let non_manifold_segments = counts.values().filter(|&&c| c > 2).count();
    ClosureAudit {
        open_segments,
        non_manifold_segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::make_box;

    #[test]
    fn box_volume_is_exact() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 2.0, 3.0, 4.0);
        let vol = store.solid_volume(solid).unwrap();
        assert!((vol - 24.0).abs() < 1e-12);
    }

    #[test]
    fn box_bounding_box() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, -1.0, 0.0, 0.0, 2.0, 1.0, 1.0);
        let bb = store.solid_bounding_box(solid);
        assert_eq!(bb.min, Point3d::new(-1.0, 0.0, 0.0));
        assert_eq!(bb.max, Point3d::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn box_is_watertight() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let faces = store.solid_faces(solid);
        let audit = audit_closure(&store, &faces, 1e-6);
        assert!(audit.is_closed(), "audit: {audit:?}");
    }

    #[test]
    fn dropping_a_face_opens_the_shell() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let faces = store.solid_faces(solid);
        let audit = audit_closure(&store, &faces[1..], 1e-6);
        assert_eq!(audit.open_segments, 4);
    }

    #[test]
    fn store_round_trips_through_json() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        let json = serde_json::to_string(&store).unwrap();
        let restored: EntityStore = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.vertices.len(), store.vertices.len());
        assert_eq!(restored.solid_volume(solid), store.solid_volume(solid));
    }

    #[test]
    fn loop_points_are_ordered() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        for face_id in store.solid_faces(solid) {
            let pts = store.face_points(face_id);
            assert_eq!(pts.len(), 4);
            // Consecutive corners of a unit box face are one unit apart.
            for i in 0..4 {
                let d = pts[i].distance_to(&pts[(i + 1) % 4]);
                assert!((d - 1.0).abs() < 1e-12);
            }
        }
    }
}
