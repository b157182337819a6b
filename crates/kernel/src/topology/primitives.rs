use std::collections::HashMap;

use tracing::{info, instrument};

use super::brep::*;
use crate::geometry::curves::{Curve, Line3d};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Plane, Sphere, Surface};
use crate::geometry::vector::Vec3;

/// Build an axis-aligned box solid with one corner at (x0,y0,z0) and the
/// opposite at (x1,y1,z1). Vertices and edges are shared between faces;
/// every loop winds counter-clockwise seen from outside.
#[instrument(skip(store))]
pub fn make_box(
    store: &mut EntityStore,
    x0: f64,
    y0: f64,
    z0: f64,
    x1: f64,
    y1: f64,
    z1: f64,
) -> SolidId {
    info!(min = ?[x0, y0, z0], max = ?[x1, y1, z1], "creating box primitive");
    let tol = crate::default_tolerance().coincidence;

    let corners = [
        Point3d::new(x0, y0, z0), // 0
        Point3d::new(x1, y0, z0), // 1
        Point3d::new(x1, y1, z0), // 2
        Point3d::new(x0, y1, z0), // 3
        Point3d::new(x0, y0, z1), // 4
        Point3d::new(x1, y0, z1), // 5
        Point3d::new(x1, y1, z1), // 6
        Point3d::new(x0, y1, z1), // 7
    ];

    let vertex_ids: Vec<VertexId> = corners
        .iter()
        .map(|p| {
            store.vertices.insert(Vertex {
                point: *p,
                tolerance: tol,
            })
        })
        .collect();

    let solid_id = store.solids.insert(Solid { shells: vec![] });
    let shell_id = store.shells.insert(Shell {
        faces: vec![],
        kind: ShellKind::Outer,
        solid: solid_id,
    });
    store.solids[solid_id].shells.push(shell_id);

    // Corner sequences wind CCW viewed from the outward-normal side.
    let face_defs: [([usize; 4], Vec3); 6] = [
        ([0, 3, 2, 1], -Vec3::Z), // bottom (z = z0)
        ([4, 5, 6, 7], Vec3::Z),  // top    (z = z1)
        ([0, 4, 7, 3], -Vec3::X), // left   (x = x0)
        ([1, 2, 6, 5], Vec3::X),  // right  (x = x1)
        ([0, 1, 5, 4], -Vec3::Y), // front  (y = y0)
        ([3, 7, 6, 2], Vec3::Y),  // back   (y = y1)
    ];

    // Shared edges, keyed by the unordered corner pair.
    let mut edge_map: HashMap<(usize, usize), EdgeId> = HashMap::new();

    for (seq, normal) in face_defs {
        let center = corners[seq[0]].midpoint(&corners[seq[2]]);
        let surface = Surface::Plane(Plane::new(center, normal));

        let loop_id = store.loops.insert(Loop {
            edges: vec![],
            face: FaceId::default(),
        });
        let face_id = store.faces.insert(Face {
            surface,
            outer_loop: loop_id,
            inner_loops: vec![],
            same_sense: true,
            shell: shell_id,
            tolerance: tol,
        });
        store.loops[loop_id].face = face_id;
        store.shells[shell_id].faces.push(face_id);

        for i in 0..4 {
            let vi = seq[i];
            let vj = seq[(i + 1) % 4];
            let key = (vi.min(vj), vi.max(vj));
            let edge_id = *edge_map.entry(key).or_insert_with(|| {
                let (a, b) = (key.0, key.1);
                let length = corners[a].distance_to(&corners[b]);
                let line = Line3d::from_points(corners[a], corners[b])
                    .unwrap_or(Line3d {
                        origin: corners[a],
                        direction: Vec3::X,
                    });
                store.edges.insert(Edge {
                    curve: Curve::Line(line),
                    first: 0.0,
                    last: length,
                    start_vertex: vertex_ids[a],
                    end_vertex: vertex_ids[b],
                    tolerance: tol,
                })
            });
            store.loops[loop_id].edges.push(EdgeUse {
                edge: edge_id,
                forward: vi < vj,
            });
        }
    }

    solid_id
}

/// Build a sphere solid: a single closed face with no boundary loop.
#[instrument(skip(store))]
pub fn make_sphere(store: &mut EntityStore, center: Point3d, radius: f64) -> SolidId {
    info!(center = ?center.to_array(), radius, "creating sphere primitive");
    let tol = crate::default_tolerance().coincidence;

    let solid_id = store.solids.insert(Solid { shells: vec![] });
    let shell_id = store.shells.insert(Shell {
        faces: vec![],
        kind: ShellKind::Outer,
        solid: solid_id,
    });
    store.solids[solid_id].shells.push(shell_id);

    let face_id = store.faces.insert(Face {
        surface: Surface::Sphere(Sphere::new(center, radius)),
        outer_loop: LoopId::default(),
        inner_loops: vec![],
        same_sense: true,
        shell: shell_id,
        tolerance: tol,
    });
    store.shells[shell_id].faces.push(face_id);

    solid_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_shares_vertices_and_edges() {
        let mut store = EntityStore::new();
        make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        assert_eq!(store.vertices.len(), 8);
        assert_eq!(store.edges.len(), 12);
        assert_eq!(store.faces.len(), 6);
        assert_eq!(store.loops.len(), 6);
    }

    #[test]
    fn box_loops_wind_outward() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        for face_id in store.solid_faces(solid) {
            let face = &store.faces[face_id];
            let pts = store.face_points(face_id);
            // Winding normal from the first corner.
            let winding = (pts[1] - pts[0]).cross(&(pts[2] - pts[1]));
            let surface_normal = face.surface.normal_at(0.0, 0.0);
            assert!(
                winding.dot(&surface_normal) > 0.0,
                "loop winding disagrees with outward normal on {face_id:?}"
            );
        }
    }

    #[test]
    fn sphere_face_has_no_loop() {
        let mut store = EntityStore::new();
        let solid = make_sphere(&mut store, Point3d::ORIGIN, 1.0);
        let faces = store.solid_faces(solid);
        assert_eq!(faces.len(), 1);
        assert!(store.face_points(faces[0]).is_empty());
        let bb = store.solid_bounding_box(solid);
        assert_eq!(bb.min, Point3d::new(-1.0, -1.0, -1.0));
        assert_eq!(bb.max, Point3d::new(1.0, 1.0, 1.0));
    }
}
