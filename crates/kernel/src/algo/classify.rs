use crate::geometry::curves::Ray;
use crate::geometry::intersection::{
    point_in_polygon_2d, polygon_boundary_distance_2d, ray_cone, ray_cylinder, ray_plane,
    ray_sphere,
};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::vector::Vec3;
use crate::topology::brep::{EntityStore, FaceId};
use crate::Tolerance;

/// Classification of a point relative to a closed face set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClass {
    Inside,
    Outside,
    OnBoundary,
}

/// Classify a point against the boundary described by `faces`.
///
/// The boundary test runs first; otherwise several rays are cast and the
/// crossing parities are put to a majority vote, which rides out individual
/// rays that graze edges or corners.
pub fn classify_point(
    store: &EntityStore,
    faces: &[FaceId],
    point: &Point3d,
    tol: &Tolerance,
) -> PointClass {
    if on_boundary(store, faces, point, tol).is_some() {
        return PointClass::OnBoundary;
    }

    let test_directions = [
        Vec3::X,
        Vec3::Y,
        Vec3::Z,
        Vec3::new(1.0, 1.0, 1.0).normalized_or(Vec3::X),
        Vec3::new(-1.0, 0.5, 0.3).normalized_or(Vec3::Y),
    ];

    let mut inside_votes = 0;
    let mut outside_votes = 0;
    for dir in &test_directions {
        let ray = Ray::new(*point, *dir);
        if count_crossings(store, faces, &ray, tol) % 2 == 1 {
            inside_votes += 1;
        } else {
            outside_votes += 1;
        }
    }

    if inside_votes > outside_votes {
        PointClass::Inside
    } else {
        PointClass::Outside
    }
}

/// The face whose surface carries `point`, when the point sits on the
/// boundary within tolerance.
pub fn on_boundary(
    store: &EntityStore,
    faces: &[FaceId],
    point: &Point3d,
    tol: &Tolerance,
) -> Option<FaceId> {
    let merge = tol.merge_distance();
    for &face_id in faces {
        let face = &store.faces[face_id];
        match &face.surface {
            Surface::Plane(plane) => {
                if plane.signed_distance(point).abs() < merge
                    && point_in_face_2d(store, face_id, point, merge)
                {
                    return Some(face_id);
                }
            }
            Surface::Sphere(sphere) => {
                if (point.distance_to(&sphere.center) - sphere.radius).abs() < merge {
                    return Some(face_id);
                }
            }
            Surface::Cylinder(cyl) => {
                if (cyl.distance_to_axis(point) - cyl.radius).abs() < merge {
                    return Some(face_id);
                }
            }
            Surface::Cone(_) => {}
        }
    }
    None
}

/// Does the oriented boundary at `point` agree with `normal`?
///
/// Checks every face carrying the point; one agreeing face is enough (a point
/// on a shared boundary edge belongs to several faces).
pub fn boundary_normal_agrees(
    store: &EntityStore,
    faces: &[FaceId],
    point: &Point3d,
    normal: &Vec3,
    tol: &Tolerance,
) -> bool {
    let merge = tol.merge_distance();
    for &face_id in faces {
        let face = &store.faces[face_id];
        if let Surface::Plane(plane) = &face.surface {
            if plane.signed_distance(point).abs() < merge
                && point_in_face_2d(store, face_id, point, merge)
            {
                let n = store.face_normal(face_id, 0.0, 0.0);
                if n.dot(normal) > 0.0 {
                    return true;
                }
            }
        }
    }
    false
}

/// Crossing count of one ray against the face set, with hits at (nearly) the
/// same distance merged so coplanar face fragments count once.
fn count_crossings(store: &EntityStore, faces: &[FaceId], ray: &Ray, tol: &Tolerance) -> usize {
    let merge = tol.merge_distance();
    let mut hit_ts: Vec<f64> = Vec::new();

    for &face_id in faces {
        let face = &store.faces[face_id];
        match &face.surface {
            Surface::Plane(plane) => {
                if let Some(hit) = ray_plane(ray, plane) {
                    if hit.t > merge && point_in_face_2d(store, face_id, &hit.point, merge) {
                        hit_ts.push(hit.t);
                    }
                }
            }
            Surface::Sphere(sphere) => {
                for hit in ray_sphere(ray, sphere) {
                    if hit.t > merge {
                        hit_ts.push(hit.t);
                    }
                }
            }
            Surface::Cylinder(cyl) => {
                for hit in ray_cylinder(ray, cyl) {
                    if hit.t > merge {
                        hit_ts.push(hit.t);
                    }
                }
            }
            Surface::Cone(cone) => {
                for hit in ray_cone(ray, cone) {
                    if hit.t > merge {
                        hit_ts.push(hit.t);
                    }
                }
            }
        }
    }

    dedup_crossings(&mut hit_ts, merge)
}

/// Sort hit parameters and merge clusters within `tol` of each other.
fn dedup_crossings(ts: &mut Vec<f64>, tol: f64) -> usize {
    if ts.is_empty() {
        return 0;
    }
    ts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut count = 1;
    let mut last = ts[0];
    for &t in ts.iter().skip(1) {
        if (t - last).abs() > tol {
            count += 1;
        }
        last = t;
    }
    count
}

/// 2D containment of a point in a planar face, holes subtracted.
/// Points within `tol` of a ring count as contained.
fn point_in_face_2d(store: &EntityStore, face_id: FaceId, point: &Point3d, tol: f64) -> bool {
    let face = &store.faces[face_id];
    let plane = match &face.surface {
        Surface::Plane(p) => p,
        _ => return false,
    };
    let (px, py) = plane.parameters_of(point);

    let outer: Vec<(f64, f64)> = store
        .face_points(face_id)
        .iter()
        .map(|p| plane.parameters_of(p))
        .collect();
    if outer.len() < 3 {
        return false;
    }
    let near_outer = polygon_boundary_distance_2d(px, py, &outer) < tol;
    if !point_in_polygon_2d(px, py, &outer) && !near_outer {
        return false;
    }

    for &inner in &face.inner_loops {
        let hole: Vec<(f64, f64)> = store
            .loop_points(inner)
            .iter()
            .map(|p| plane.parameters_of(p))
            .collect();
        if hole.len() >= 3
            && point_in_polygon_2d(px, py, &hole)
            && polygon_boundary_distance_2d(px, py, &hole) > tol
        {
            return false;
        }
    }
    true
}
