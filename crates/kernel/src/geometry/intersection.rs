use nalgebra::{Matrix3, Vector3};

use super::curves::{Line3d, Ray};
use super::point::Point3d;
use super::surfaces::{Cone, Cylinder, Plane, Sphere};
use super::vector::Vec3;

/// Result of a curve-curve closest-approach computation.
#[derive(Debug, Clone)]
pub struct CurveCurveHit {
    pub point: Point3d,
    pub t1: f64,
    pub t2: f64,
    /// Gap between the two curves at the hit (0 for a true crossing).
    pub distance: f64,
}

/// Result of a ray-surface intersection.
#[derive(Debug, Clone)]
pub struct RaySurfaceHit {
    pub point: Point3d,
    pub t: f64,
    pub normal: Vec3,
}

// ─── Line-Line ──────────────────────────────────────────────────────────────

/// Closest points between two lines. `None` if the lines are parallel.
/// Returns (point_on_l1, t1, point_on_l2, t2, distance).
pub fn line_line_closest(l1: &Line3d, l2: &Line3d) -> Option<(Point3d, f64, Point3d, f64, f64)> {
    let w = l1.origin - l2.origin;
    let a = l1.direction.dot(&l1.direction);
    let b = l1.direction.dot(&l2.direction);
    let c = l2.direction.dot(&l2.direction);
    let d = l1.direction.dot(&w);
    let e = l2.direction.dot(&w);

    let denom = a * c - b * b;
    if denom.abs() < 1e-15 {
        return None;
    }

    let t1 = (b * e - c * d) / denom;
    let t2 = (a * e - b * d) / denom;
    let p1 = l1.evaluate(t1);
    let p2 = l2.evaluate(t2);
    Some((p1, t1, p2, t2, p1.distance_to(&p2)))
}

/// Intersect two lines; a hit requires the gap to close within `tol`.
pub fn line_line_intersection(l1: &Line3d, l2: &Line3d, tol: f64) -> Vec<CurveCurveHit> {
    match line_line_closest(l1, l2) {
        Some((p1, t1, p2, t2, dist)) if dist < tol => vec![CurveCurveHit {
            point: p1.midpoint(&p2),
            t1,
            t2,
            distance: dist,
        }],
        _ => vec![],
    }
}

/// Closest pair between two bounded segments, clamping line parameters to
/// the segment ranges. Always produces an answer.
pub fn segment_segment_closest(
    a0: &Point3d,
    a1: &Point3d,
    b0: &Point3d,
    b1: &Point3d,
) -> (Point3d, f64, Point3d, f64, f64) {
    let da = *a1 - *a0;
    let db = *b1 - *b0;
    let r = *a0 - *b0;
    let a = da.dot(&da);
    let e = db.dot(&db);
    let f = db.dot(&r);

    let (mut s, mut t);
    if a < 1e-30 && e < 1e-30 {
        s = 0.0;
        t = 0.0;
    } else if a < 1e-30 {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = da.dot(&r);
        if e < 1e-30 {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = da.dot(&db);
            let denom = a * e - b * b;
            s = if denom.abs() > 1e-30 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
        }
    }

    let pa = a0.lerp(a1, s);
    let pb = b0.lerp(b1, t);
    (pa, s, pb, t, pa.distance_to(&pb))
}

// ─── Ray-Surface ────────────────────────────────────────────────────────────

pub fn ray_plane(ray: &Ray, plane: &Plane) -> Option<RaySurfaceHit> {
    let denom = ray.direction.dot(&plane.normal);
    if denom.abs() < 1e-15 {
        return None;
    }
    let t = (plane.origin - ray.origin).dot(&plane.normal) / denom;
    if t < 0.0 {
        return None;
    }
    Some(RaySurfaceHit {
        point: ray.at(t),
        t,
        normal: if denom < 0.0 {
            plane.normal
        } else {
            -plane.normal
        },
    })
}

pub fn ray_sphere(ray: &Ray, sphere: &Sphere) -> Vec<RaySurfaceHit> {
    let oc = ray.origin - sphere.center;
    let a = ray.direction.dot(&ray.direction);
    let b = 2.0 * oc.dot(&ray.direction);
    let c = oc.dot(&oc) - sphere.radius * sphere.radius;
    let mut hits = Vec::new();
    for t in solve_quadratic(a, b, c) {
        if t >= 0.0 {
            let point = ray.at(t);
            hits.push(RaySurfaceHit {
                point,
                t,
                normal: (point - sphere.center).normalized_or(Vec3::Z),
            });
        }
    }
    sort_hits(&mut hits);
    hits
}

pub fn ray_cylinder(ray: &Ray, cyl: &Cylinder) -> Vec<RaySurfaceHit> {
    let oc = ray.origin - cyl.origin;
    let d_proj = ray.direction - cyl.axis * ray.direction.dot(&cyl.axis);
    let oc_proj = oc - cyl.axis * oc.dot(&cyl.axis);

    let a = d_proj.dot(&d_proj);
    if a < 1e-15 {
        // Ray parallel to the axis: misses or runs inside the wall.
        return vec![];
    }
    let b = 2.0 * d_proj.dot(&oc_proj);
    let c = oc_proj.dot(&oc_proj) - cyl.radius * cyl.radius;

    let mut hits = Vec::new();
    for t in solve_quadratic(a, b, c) {
        if t >= 0.0 {
            let point = ray.at(t);
            let to_point = point - cyl.origin;
            let radial = to_point - cyl.axis * to_point.dot(&cyl.axis);
            hits.push(RaySurfaceHit {
                point,
                t,
                normal: radial.normalized_or(cyl.ref_dir),
            });
        }
    }
    sort_hits(&mut hits);
    hits
}

pub fn ray_cone(ray: &Ray, cone: &Cone) -> Vec<RaySurfaceHit> {
    let co = ray.origin - cone.apex;
    let cos2 = {
        let c = cone.half_angle.cos();
        c * c
    };
    let d_dot_a = ray.direction.dot(&cone.axis);
    let co_dot_a = co.dot(&cone.axis);

    let a = d_dot_a * d_dot_a - cos2 * ray.direction.dot(&ray.direction);
    let b = 2.0 * (d_dot_a * co_dot_a - cos2 * co.dot(&ray.direction));
    let c = co_dot_a * co_dot_a - cos2 * co.dot(&co);

    let mut hits = Vec::new();
    let roots = if a.abs() < 1e-15 {
        if b.abs() < 1e-15 {
            vec![]
        } else {
            vec![-c / b]
        }
    } else {
        solve_quadratic(a, b, c)
    };
    for t in roots {
        if t >= 0.0 {
            let point = ray.at(t);
            let v = point - cone.apex;
            let along = v.dot(&cone.axis);
            hits.push(RaySurfaceHit {
                point,
                t,
                normal: cone.normal_at(cone_angle_of(cone, &point), along),
            });
        }
    }
    sort_hits(&mut hits);
    hits
}

fn cone_angle_of(cone: &Cone, p: &Point3d) -> f64 {
    let v = *p - cone.apex;
    let radial = v - cone.axis * v.dot(&cone.axis);
    let y_dir = cone.axis.cross(&cone.ref_dir);
    radial.dot(&y_dir).atan2(radial.dot(&cone.ref_dir))
}

// ─── Ray-AABB ───────────────────────────────────────────────────────────────

pub fn ray_aabb(ray: &Ray, bb_min: &Point3d, bb_max: &Point3d) -> Option<f64> {
    let mut tmin = f64::NEG_INFINITY;
    let mut tmax = f64::INFINITY;

    let origin = ray.origin.to_array();
    let dir = [ray.direction.x, ray.direction.y, ray.direction.z];
    let min = bb_min.to_array();
    let max = bb_max.to_array();

    for i in 0..3 {
        if dir[i].abs() < 1e-15 {
            if origin[i] < min[i] || origin[i] > max[i] {
                return None;
            }
        } else {
            let inv = 1.0 / dir[i];
            let mut t0 = (min[i] - origin[i]) * inv;
            let mut t1 = (max[i] - origin[i]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            tmin = tmin.max(t0);
            tmax = tmax.min(t1);
            if tmax < tmin {
                return None;
            }
        }
    }

    if tmax < 0.0 {
        None
    } else {
        Some(tmin.max(0.0))
    }
}

// ─── Plane-Plane ────────────────────────────────────────────────────────────

/// Intersect two transverse planes. `None` if parallel (coincident or not).
///
/// The line origin is the minimum-norm solution of the two plane equations,
/// obtained by adding the line direction as a third constraint through the
/// global origin and solving the 3x3 system.
pub fn plane_plane_line(p1: &Plane, p2: &Plane) -> Option<Line3d> {
    let dir = p1.normal.cross(&p2.normal);
    let len = dir.length();
    if len < 1e-12 {
        return None;
    }
    let dir = dir / len;

    let m = Matrix3::new(
        p1.normal.x, p1.normal.y, p1.normal.z, //
        p2.normal.x, p2.normal.y, p2.normal.z, //
        dir.x, dir.y, dir.z,
    );
    let rhs = Vector3::new(
        p1.origin.to_vec3().dot(&p1.normal),
        p2.origin.to_vec3().dot(&p2.normal),
        0.0,
    );
    let origin = m.lu().solve(&rhs)?;

    Line3d::new(Point3d::new(origin.x, origin.y, origin.z), dir)
}

// ─── 2D polygon predicates ──────────────────────────────────────────────────

/// Point-in-polygon by crossing parity in 2D parameter space.
pub fn point_in_polygon_2d(px: f64, py: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from a 2D point to the polygon boundary.
pub fn polygon_boundary_distance_2d(px: f64, py: f64, polygon: &[(f64, f64)]) -> f64 {
    let n = polygon.len();
    let mut best = f64::INFINITY;
    for i in 0..n {
        let (x0, y0) = polygon[i];
        let (x1, y1) = polygon[(i + 1) % n];
        let (ex, ey) = (x1 - x0, y1 - y0);
        let len2 = ex * ex + ey * ey;
        let t = if len2 < 1e-30 {
            0.0
        } else {
            (((px - x0) * ex + (py - y0) * ey) / len2).clamp(0.0, 1.0)
        };
        let (cx, cy) = (x0 + t * ex, y0 + t * ey);
        let d = ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt();
        best = best.min(d);
    }
    best
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < 1e-15 {
        if b.abs() < 1e-15 {
            return vec![];
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < -1e-15 {
        return vec![];
    }
    let sq = disc.max(0.0).sqrt();
    vec![(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)]
}

fn sort_hits(hits: &mut [RaySurfaceHit]) {
    hits.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap_or(std::cmp::Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_line_crossing() {
        let l1 = Line3d::new(Point3d::ORIGIN, Vec3::X).unwrap();
        let l2 = Line3d::new(Point3d::new(2.0, -1.0, 0.0), Vec3::Y).unwrap();
        let hits = line_line_intersection(&l1, &l2, 1e-9);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].point.distance_to(&Point3d::new(2.0, 0.0, 0.0)) < 1e-12);
        assert!((hits[0].t1 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn line_line_skew_and_parallel() {
        let l1 = Line3d::new(Point3d::ORIGIN, Vec3::X).unwrap();
        let skew = Line3d::new(Point3d::new(0.0, 0.0, 5.0), Vec3::Y).unwrap();
        assert!(line_line_intersection(&l1, &skew, 1e-9).is_empty());
        let parallel = Line3d::new(Point3d::new(0.0, 1.0, 0.0), Vec3::X).unwrap();
        assert!(line_line_closest(&l1, &parallel).is_none());
    }

    #[test]
    fn segment_segment_clamps_to_ends() {
        let (pa, s, pb, t, dist) = segment_segment_closest(
            &Point3d::ORIGIN,
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(3.0, 1.0, 0.0),
            &Point3d::new(5.0, 1.0, 0.0),
        );
        assert_eq!(s, 1.0);
        assert_eq!(t, 0.0);
        assert_eq!(pa, Point3d::new(1.0, 0.0, 0.0));
        assert_eq!(pb, Point3d::new(3.0, 1.0, 0.0));
        assert!((dist - 5.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn ray_plane_from_above() {
        let ray = Ray::new(Point3d::new(0.0, 0.0, 10.0), -Vec3::Z);
        let hit = ray_plane(&ray, &Plane::xy()).unwrap();
        assert!((hit.t - 10.0).abs() < 1e-12);
        assert!(hit.point.distance_to(&Point3d::ORIGIN) < 1e-12);
    }

    #[test]
    fn ray_sphere_two_hits_sorted() {
        let ray = Ray::new(Point3d::new(0.0, 0.0, 10.0), -Vec3::Z);
        let hits = ray_sphere(&ray, &Sphere::new(Point3d::ORIGIN, 1.0));
        assert_eq!(hits.len(), 2);
        assert!((hits[0].point.z - 1.0).abs() < 1e-10);
        assert!((hits[1].point.z + 1.0).abs() < 1e-10);
    }

    #[test]
    fn ray_cylinder_entry_exit() {
        let ray = Ray::new(Point3d::new(10.0, 0.0, 1.0), -Vec3::X);
        let hits = ray_cylinder(&ray, &Cylinder::new(Point3d::ORIGIN, Vec3::Z, 3.0));
        assert_eq!(hits.len(), 2);
        assert!((hits[0].point.x - 3.0).abs() < 1e-10);
        assert!((hits[1].point.x + 3.0).abs() < 1e-10);
    }

    #[test]
    fn ray_cone_at_height() {
        let cone = Cone::new(Point3d::ORIGIN, Vec3::Z, std::f64::consts::FRAC_PI_4);
        let ray = Ray::new(Point3d::new(-10.0, 0.0, 5.0), Vec3::X);
        let hits = ray_cone(&ray, &cone);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].point.x + 5.0).abs() < 1e-8);
        assert!((hits[1].point.x - 5.0).abs() < 1e-8);
    }

    #[test]
    fn plane_plane_line_is_shared() {
        let p1 = Plane::xy();
        let p2 = Plane::new(Point3d::new(0.5, 0.0, 0.0), Vec3::X);
        let line = plane_plane_line(&p1, &p2).unwrap();
        assert!(line.direction.is_parallel_to(&Vec3::Y, 1e-10));
        // The line origin satisfies both plane equations.
        assert!(p1.signed_distance(&line.origin).abs() < 1e-12);
        assert!(p2.signed_distance(&line.origin).abs() < 1e-12);
        assert!(plane_plane_line(&p1, &Plane::xy()).is_none());
    }

    #[test]
    fn polygon_predicates() {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(point_in_polygon_2d(0.5, 0.5, &square));
        assert!(!point_in_polygon_2d(1.5, 0.5, &square));
        assert!((polygon_boundary_distance_2d(0.5, 0.5, &square) - 0.5).abs() < 1e-12);
        assert!(polygon_boundary_distance_2d(1.0, 0.5, &square) < 1e-12);
    }

    #[test]
    fn ray_aabb_entry_distance() {
        let ray = Ray::new(Point3d::new(-5.0, 0.5, 0.5), Vec3::X);
        let t = ray_aabb(&ray, &Point3d::ORIGIN, &Point3d::new(1.0, 1.0, 1.0));
        assert!((t.unwrap() - 5.0).abs() < 1e-10);
        let miss = Ray::new(Point3d::new(-5.0, 5.0, 5.0), Vec3::X);
        assert!(ray_aabb(&miss, &Point3d::ORIGIN, &Point3d::new(1.0, 1.0, 1.0)).is_none());
    }
}
