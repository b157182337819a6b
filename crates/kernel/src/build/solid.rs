//! Solid rebuilding: group surviving face patches into shells by edge
//! adjacency, decide which shells bound material and which are internal
//! voids, and materialize the result topology in the entity store.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::geometry::curves::{Curve, Line3d};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Plane, Surface};
use crate::geometry::transform::BoundingBox;
use crate::geometry::vector::Vec3;
use crate::topology::brep::{
    point_key, Edge, EdgeUse, EntityStore, Face, FaceId, Loop, Shell, ShellKind, Solid, SolidId,
    Vertex, VertexId,
};

use super::face::FacePatch;

type SegmentKey = ((i64, i64, i64), (i64, i64, i64));

/// What the builder produced: the new solids plus the provenance of every
/// new face (dataset index of the source face it was carved from).
#[derive(Debug, Default)]
pub struct BuildResult {
    pub solids: Vec<SolidId>,
    pub face_origins: Vec<(usize, FaceId)>,
}

/// Builds solids out of the face patches kept by the classification stage.
pub struct SolidBuilder {
    patches: Vec<FacePatch>,
    /// Curved faces kept whole: (store face, reversed, dataset source).
    curved: Vec<(FaceId, bool, usize)>,
    grid: f64,
}

impl SolidBuilder {
    pub fn new(grid: f64) -> Self {
        Self {
            patches: Vec::new(),
            curved: Vec::new(),
            grid,
        }
    }

    pub fn add_patch(&mut self, patch: FacePatch) {
        self.patches.push(patch);
    }

    pub fn add_curved_face(&mut self, face: FaceId, reversed: bool, source: usize) {
        self.curved.push((face, reversed, source));
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.curved.is_empty()
    }

    /// Group, classify and materialize. Returns the new solids.
    #[instrument(skip(self, store), fields(patches = self.patches.len(), curved = self.curved.len()))]
    pub fn build(&self, store: &mut EntityStore) -> BuildResult {
        let mut out = BuildResult::default();
        let groups = self.adjacency_groups();
        debug!(group_count = groups.len(), "grouped face patches into shells");

        // Materialize planar groups, separating outer shells from voids by
        // the sign of the enclosed volume.
        struct Built {
            solid: Option<SolidId>,
            shell: crate::topology::brep::ShellId,
            bbox: BoundingBox,
            volume: f64,
        }
        let mut built: Vec<Built> = Vec::new();

        for group in &groups {
            let volume = self.group_volume(group);
            let bbox = self.group_bbox(group);
            let outer = volume >= 0.0;

            let shell = self.materialize_group(store, group, outer, &mut out.face_origins);
            let solid = if outer {
                let solid = store.solids.insert(Solid { shells: vec![shell] });
                store.shells[shell].solid = solid;
                Some(solid)
            } else {
                None
            };
            built.push(Built {
                solid,
                shell,
                bbox,
                volume,
            });
        }

        // Curved faces each carry their own shell.
        for &(face_id, reversed, ds_source) in &self.curved {
            let bbox = store.face_bounding_box(face_id);
            let shell = store.shells.insert(Shell {
                faces: vec![],
                kind: if reversed {
                    ShellKind::Void
                } else {
                    ShellKind::Outer
                },
                solid: SolidId::default(),
            });
            let source = store.faces[face_id].clone();
            let new_face = store.faces.insert(Face {
                same_sense: source.same_sense != reversed,
                shell,
                ..source
            });
            store.shells[shell].faces.push(new_face);
            out.face_origins.push((ds_source, new_face));

            let solid = if reversed {
                None
            } else {
                let solid = store.solids.insert(Solid { shells: vec![shell] });
                store.shells[shell].solid = solid;
                Some(solid)
            };
            built.push(Built {
                solid,
                shell,
                bbox,
                volume: if reversed { -1.0 } else { 1.0 },
            });
        }

        // Attach every void shell to the smallest enclosing outer solid.
        let outer_info: Vec<(usize, SolidId, BoundingBox, f64)> = built
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.solid.map(|s| (i, s, b.bbox, b.volume)))
            .collect();
        for b in built.iter().filter(|b| b.solid.is_none()) {
            let mut best: Option<(SolidId, f64)> = None;
            for &(_, solid, obbox, ovol) in &outer_info {
                let contains = obbox.contains_point(&b.bbox.center())
                    && obbox.expanded(self.grid).contains_point(&b.bbox.min)
                    && obbox.expanded(self.grid).contains_point(&b.bbox.max);
                if contains && best.map_or(true, |(_, v)| ovol < v) {
                    best = Some((solid, ovol));
                }
            }
            if let Some((solid, _)) = best {
                store.solids[solid].shells.push(b.shell);
                store.shells[b.shell].solid = solid;
            } else {
                // A void with no container is an orphan; promote it to a
                // solid of its own so nothing silently disappears.
                let solid = store.solids.insert(Solid {
                    shells: vec![b.shell],
                });
                store.shells[b.shell].solid = solid;
            }
        }

        out.solids = built.iter().filter_map(|b| b.solid).collect();
        out
    }

    // ── Grouping ───────────────────────────────────────────────────────────

    /// Patch indices grouped by shared boundary segments.
    fn adjacency_groups(&self) -> Vec<Vec<usize>> {
        let mut uf = UnionFind::new(self.patches.len());
        let mut seen: HashMap<SegmentKey, usize> = HashMap::new();

        for (i, patch) in self.patches.iter().enumerate() {
            for key in self.segment_keys(patch) {
                match seen.get(&key) {
                    Some(&j) => uf.union(i, j),
                    None => {
                        seen.insert(key, i);
                    }
                }
            }
        }

        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..self.patches.len() {
            groups.entry(uf.find(i)).or_default().push(i);
        }
        groups.into_values().collect()
    }

    fn segment_keys(&self, patch: &FacePatch) -> Vec<SegmentKey> {
        let pts = &patch.ring.points;
        (0..pts.len())
            .map(|i| {
                let a = point_key(&pts[i], self.grid);
                let b = point_key(&pts[(i + 1) % pts.len()], self.grid);
                if a <= b {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect()
    }

    fn group_volume(&self, group: &[usize]) -> f64 {
        let mut six_v = 0.0;
        for &i in group {
            let pts = &self.patches[i].ring.points;
            let anchor = pts[0].to_vec3();
            for k in 1..pts.len() - 1 {
                six_v += anchor.dot(&pts[k].to_vec3().cross(&pts[k + 1].to_vec3()));
            }
        }
        six_v / 6.0
    }

    fn group_bbox(&self, group: &[usize]) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        for &i in group {
            for p in &self.patches[i].ring.points {
                bb.expand_to_include(p);
            }
        }
        bb
    }

    // ── Materialization ────────────────────────────────────────────────────

    /// Create store entities for one patch group as a single shell.
    fn materialize_group(
        &self,
        store: &mut EntityStore,
        group: &[usize],
        outer: bool,
        face_origins: &mut Vec<(usize, FaceId)>,
    ) -> crate::topology::brep::ShellId {
        let shell = store.shells.insert(Shell {
            faces: vec![],
            kind: if outer {
                ShellKind::Outer
            } else {
                ShellKind::Void
            },
            solid: SolidId::default(),
        });

        // Vertices and edges shared within the group via quantized keys.
        let mut vertex_map: HashMap<(i64, i64, i64), VertexId> = HashMap::new();
        let mut edge_map: HashMap<SegmentKey, crate::topology::brep::EdgeId> = HashMap::new();

        for &i in group {
            let patch = &self.patches[i];
            let ring = &patch.ring;
            let n = ring.points.len();

            let loop_id = store.loops.insert(Loop {
                edges: vec![],
                face: FaceId::default(),
            });
            let face_id = store.faces.insert(Face {
                surface: Surface::Plane(Plane::new(ring.centroid(), ring.normal)),
                outer_loop: loop_id,
                inner_loops: vec![],
                same_sense: true,
                shell,
                tolerance: patch.tolerance,
            });
            store.loops[loop_id].face = face_id;
            store.shells[shell].faces.push(face_id);
            face_origins.push((patch.source, face_id));

            for k in 0..n {
                let pa = ring.points[k];
                let pb = ring.points[(k + 1) % n];
                let ka = point_key(&pa, self.grid);
                let kb = point_key(&pb, self.grid);

                let va = *vertex_map.entry(ka).or_insert_with(|| {
                    store.vertices.insert(Vertex {
                        point: pa,
                        tolerance: patch.tolerance,
                    })
                });
                let vb = *vertex_map.entry(kb).or_insert_with(|| {
                    store.vertices.insert(Vertex {
                        point: pb,
                        tolerance: patch.tolerance,
                    })
                });

                let seg_key = if ka <= kb { (ka, kb) } else { (kb, ka) };
                let forward_key = ka <= kb;
                let edge_id = *edge_map.entry(seg_key).or_insert_with(|| {
                    // Store the edge in key order so `forward` is derivable
                    // from the traversal direction alone.
                    let (start_v, end_v, start_p, end_p) = if forward_key {
                        (va, vb, pa, pb)
                    } else {
                        (vb, va, pb, pa)
                    };
                    let length = start_p.distance_to(&end_p);
                    let line = Line3d::from_points(start_p, end_p).unwrap_or(Line3d {
                        origin: start_p,
                        direction: Vec3::X,
                    });
                    store.edges.insert(Edge {
                        curve: Curve::Line(line),
                        first: 0.0,
                        last: length,
                        start_vertex: start_v,
                        end_vertex: end_v,
                        tolerance: patch.tolerance,
                    })
                });

                store.loops[loop_id].edges.push(EdgeUse {
                    edge: edge_id,
                    forward: forward_key,
                });
            }
        }

        shell
    }
}

// ─── Union-find over patch indices ──────────────────────────────────────────

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}
