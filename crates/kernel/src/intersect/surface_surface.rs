use crate::geometry::curves::{Circle3d, Curve, Line3d};
use crate::geometry::intersection::plane_plane_line;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Cylinder, Plane, Sphere, Surface};
use crate::Tolerance;

use super::{NotDoneReason, Status};

/// Classified result of intersecting two analytic surfaces.
///
/// Tangencies are separated from transversal sections because downstream
/// orientation logic treats them differently.
#[derive(Debug, Clone)]
pub enum SurfaceSection {
    /// No intersection.
    None,
    /// Surfaces touch at a single point (tangency).
    Point {
        point: Point3d,
        achieved_tolerance: f64,
    },
    /// Surfaces intersect along one curve.
    Curve {
        curve: Curve,
        achieved_tolerance: f64,
    },
    /// Surfaces intersect along two curves (plane cutting a cylinder
    /// parallel to its axis).
    TwoCurves {
        curves: [Curve; 2],
        achieved_tolerance: f64,
    },
    /// Same geometric locus; there is no lower-dimensional section.
    Coincident,
    /// No analytic treatment for this pair.
    NotDone(NotDoneReason),
}

impl SurfaceSection {
    pub fn status(&self) -> Status {
        match self {
            SurfaceSection::NotDone(reason) => Status::NotDone(*reason),
            SurfaceSection::Coincident => Status::InfiniteSolutions,
            _ => Status::Done,
        }
    }
}

/// Intersect two analytic surfaces.
pub fn surface_surface(s1: &Surface, s2: &Surface, tol: &Tolerance) -> SurfaceSection {
    match (s1, s2) {
        (Surface::Plane(a), Surface::Plane(b)) => plane_plane(a, b, tol),
        (Surface::Plane(p), Surface::Sphere(s)) | (Surface::Sphere(s), Surface::Plane(p)) => {
            plane_sphere(p, s, tol)
        }
        (Surface::Plane(p), Surface::Cylinder(c)) | (Surface::Cylinder(c), Surface::Plane(p)) => {
            plane_cylinder(p, c, tol)
        }
        (Surface::Sphere(a), Surface::Sphere(b)) => sphere_sphere(a, b, tol),
        _ => SurfaceSection::NotDone(NotDoneReason::UnsupportedPair),
    }
}

fn plane_plane(a: &Plane, b: &Plane, tol: &Tolerance) -> SurfaceSection {
    if a.normal.is_parallel_to(&b.normal, tol.angular) {
        if a.signed_distance(&b.origin).abs() < tol.merge_distance() {
            return SurfaceSection::Coincident;
        }
        return SurfaceSection::None;
    }
    match plane_plane_line(a, b) {
        Some(line) => SurfaceSection::Curve {
            curve: Curve::Line(line),
            achieved_tolerance: tol.coincidence,
        },
        None => SurfaceSection::None,
    }
}

fn plane_sphere(plane: &Plane, sphere: &Sphere, tol: &Tolerance) -> SurfaceSection {
    let merge = tol.merge_distance();
    let dist = plane.signed_distance(&sphere.center);
    let gap = dist.abs() - sphere.radius;

    if gap > merge {
        return SurfaceSection::None;
    }
    if gap.abs() <= merge {
        return SurfaceSection::Point {
            point: sphere.center - plane.normal * dist,
            achieved_tolerance: gap.abs().max(tol.coincidence),
        };
    }

    let center = sphere.center - plane.normal * dist;
    let radius = (sphere.radius * sphere.radius - dist * dist).sqrt();
    SurfaceSection::Curve {
        curve: Curve::Circle(Circle3d::new(center, plane.normal, radius)),
        achieved_tolerance: tol.coincidence,
    }
}

fn plane_cylinder(plane: &Plane, cyl: &Cylinder, tol: &Tolerance) -> SurfaceSection {
    let merge = tol.merge_distance();
    let cos_theta = plane.normal.dot(&cyl.axis).abs();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    if sin_theta < tol.angular {
        // Plane perpendicular to the axis: a circle at the plane height.
        let dist = plane.signed_distance(&cyl.origin);
        let center = cyl.origin - plane.normal * dist;
        return SurfaceSection::Curve {
            curve: Curve::Circle(Circle3d::new(center, cyl.axis, cyl.radius)),
            achieved_tolerance: tol.coincidence,
        };
    }

    if cos_theta < tol.angular {
        // Plane parallel to the axis: zero, one, or two ruling lines.
        let axis_point_dist = plane.signed_distance(&cyl.origin);
        let gap = axis_point_dist.abs() - cyl.radius;
        if gap > merge {
            return SurfaceSection::None;
        }
        let foot = cyl.origin - plane.normal * axis_point_dist;
        if gap.abs() <= merge {
            let line = match Line3d::new(foot, cyl.axis) {
                Some(l) => l,
                None => return SurfaceSection::None,
            };
            return SurfaceSection::Curve {
                curve: Curve::Line(line),
                achieved_tolerance: gap.abs().max(tol.coincidence),
            };
        }
        let half_chord = (cyl.radius * cyl.radius - axis_point_dist * axis_point_dist).sqrt();
        let across = cyl.axis.cross(&plane.normal).normalized_or(cyl.ref_dir);
        let mut lines = Vec::with_capacity(2);
        for sign in [-1.0, 1.0] {
            if let Some(l) = Line3d::new(foot + across * (half_chord * sign), cyl.axis) {
                lines.push(Curve::Line(l));
            }
        }
        if let [l1, l2] = lines.as_slice() {
            return SurfaceSection::TwoCurves {
                curves: [l1.clone(), l2.clone()],
                achieved_tolerance: tol.coincidence,
            };
        }
        return SurfaceSection::None;
    }

    // Oblique plane: the section is an ellipse, which the closed curve set
    // does not carry; callers fall back to sampled classification.
    SurfaceSection::NotDone(NotDoneReason::UnsupportedPair)
}

fn sphere_sphere(a: &Sphere, b: &Sphere, tol: &Tolerance) -> SurfaceSection {
    let merge = tol.merge_distance();
    let d = a.center.distance_to(&b.center);

    if d < merge {
        if (a.radius - b.radius).abs() < merge {
            return SurfaceSection::Coincident;
        }
        return SurfaceSection::None;
    }

    let outer_gap = d - (a.radius + b.radius);
    let inner_gap = (a.radius - b.radius).abs() - d;
    if outer_gap > merge || inner_gap > merge {
        return SurfaceSection::None;
    }

    let axis = (b.center - a.center) / d;
    if outer_gap.abs() <= merge || inner_gap.abs() <= merge {
        // External or internal tangency: a single touch point.
        let t = if outer_gap.abs() <= merge {
            a.radius
        } else if a.radius > b.radius {
            a.radius
        } else {
            -a.radius
        };
        return SurfaceSection::Point {
            point: a.center + axis * t,
            achieved_tolerance: outer_gap.abs().min(inner_gap.abs()).max(tol.coincidence),
        };
    }

    // Transversal: the radical-plane circle.
    let along = (d * d + a.radius * a.radius - b.radius * b.radius) / (2.0 * d);
    let radius_sq = a.radius * a.radius - along * along;
    if radius_sq <= 0.0 {
        return SurfaceSection::None;
    }
    SurfaceSection::Curve {
        curve: Curve::Circle(Circle3d::new(
            a.center + axis * along,
            axis,
            radius_sq.sqrt(),
        )),
        achieved_tolerance: tol.coincidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vector::Vec3;

    #[test]
    fn transverse_planes_give_a_line() {
        let a = Surface::Plane(Plane::xy());
        let b = Surface::Plane(Plane::new(Point3d::new(0.5, 0.0, 0.0), Vec3::X));
        match surface_surface(&a, &b, &Tolerance::default()) {
            SurfaceSection::Curve {
                curve: Curve::Line(line),
                ..
            } => {
                assert!(line.direction.is_parallel_to(&Vec3::Y, 1e-10));
                assert!((line.origin.x - 0.5).abs() < 1e-12);
                assert!(line.origin.z.abs() < 1e-12);
            }
            other => panic!("expected a section line, got {other:?}"),
        }
    }

    #[test]
    fn parallel_and_coincident_planes() {
        let a = Surface::Plane(Plane::xy());
        let apart = Surface::Plane(Plane::new(Point3d::new(0.0, 0.0, 1.0), Vec3::Z));
        assert!(matches!(
            surface_surface(&a, &apart, &Tolerance::default()),
            SurfaceSection::None
        ));
        let same = Surface::Plane(Plane::new(Point3d::new(3.0, -1.0, 0.0), -Vec3::Z));
        assert!(matches!(
            surface_surface(&a, &same, &Tolerance::default()),
            SurfaceSection::Coincident
        ));
    }

    #[test]
    fn plane_sphere_circle_and_tangency() {
        let sphere = Surface::Sphere(Sphere::new(Point3d::ORIGIN, 1.0));

        let cutting = Surface::Plane(Plane::new(Point3d::new(0.0, 0.0, 0.5), Vec3::Z));
        match surface_surface(&cutting, &sphere, &Tolerance::default()) {
            SurfaceSection::Curve {
                curve: Curve::Circle(c),
                ..
            } => {
                assert!((c.radius - (0.75f64).sqrt()).abs() < 1e-12);
                assert!((c.center.z - 0.5).abs() < 1e-12);
            }
            other => panic!("expected a section circle, got {other:?}"),
        }

        let touching = Surface::Plane(Plane::new(Point3d::new(0.0, 0.0, 1.0), Vec3::Z));
        match surface_surface(&touching, &sphere, &Tolerance::default()) {
            SurfaceSection::Point { point, .. } => {
                assert!(point.distance_to(&Point3d::new(0.0, 0.0, 1.0)) < 1e-9);
            }
            other => panic!("expected a tangency point, got {other:?}"),
        }
    }

    #[test]
    fn plane_cylinder_parallel_axis_cases() {
        let cyl = Surface::Cylinder(Cylinder::new(Point3d::ORIGIN, Vec3::Z, 1.0));

        let secant = Surface::Plane(Plane::new(Point3d::new(0.5, 0.0, 0.0), Vec3::X));
        assert!(matches!(
            surface_surface(&secant, &cyl, &Tolerance::default()),
            SurfaceSection::TwoCurves { .. }
        ));

        let tangent = Surface::Plane(Plane::new(Point3d::new(1.0, 0.0, 0.0), Vec3::X));
        assert!(matches!(
            surface_surface(&tangent, &cyl, &Tolerance::default()),
            SurfaceSection::Curve {
                curve: Curve::Line(_),
                ..
            }
        ));

        let missing = Surface::Plane(Plane::new(Point3d::new(2.0, 0.0, 0.0), Vec3::X));
        assert!(matches!(
            surface_surface(&missing, &cyl, &Tolerance::default()),
            SurfaceSection::None
        ));
    }

    #[test]
    fn tangent_spheres_touch_at_one_point() {
        let a = Surface::Sphere(Sphere::new(Point3d::ORIGIN, 1.0));
        let b = Surface::Sphere(Sphere::new(Point3d::new(2.0, 0.0, 0.0), 1.0));
        match surface_surface(&a, &b, &Tolerance::default()) {
            SurfaceSection::Point { point, .. } => {
                assert!(point.distance_to(&Point3d::new(1.0, 0.0, 0.0)) < 1e-9);
            }
            other => panic!("expected a tangency point, got {other:?}"),
        }
    }

    #[test]
    fn overlapping_spheres_share_a_circle() {
        let a = Surface::Sphere(Sphere::new(Point3d::ORIGIN, 1.0));
        let b = Surface::Sphere(Sphere::new(Point3d::new(1.0, 0.0, 0.0), 1.0));
        match surface_surface(&a, &b, &Tolerance::default()) {
            SurfaceSection::Curve {
                curve: Curve::Circle(c),
                ..
            } => {
                assert!((c.center.x - 0.5).abs() < 1e-12);
                assert!((c.radius - (0.75f64).sqrt()).abs() < 1e-12);
            }
            other => panic!("expected a section circle, got {other:?}"),
        }
    }
}
