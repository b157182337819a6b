use crate::geometry::curves::{Circle3d, Curve, Line3d};
use crate::geometry::surfaces::{Cylinder, Plane, Sphere, Surface};
use crate::Tolerance;

use super::{order_by_first_parameter, IntersectionPoint, NotDoneReason, PointKind, Status};

/// Curve/surface intersector over a bounded curve range.
///
/// Unlike the ray casts in `geometry::intersection`, the curve is two-sided:
/// all real roots inside the parameter range count.
pub struct CurveSurfaceIntersector<'a> {
    curve: &'a Curve,
    range: (f64, f64),
    surface: &'a Surface,
    tol: Tolerance,
    status: Status,
    points: Vec<IntersectionPoint>,
}

impl<'a> CurveSurfaceIntersector<'a> {
    pub fn new(curve: &'a Curve, range: (f64, f64), surface: &'a Surface, tol: Tolerance) -> Self {
        Self {
            curve,
            range,
            surface,
            tol,
            status: Status::NotDone(NotDoneReason::ToleranceNotAchieved),
            points: Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn points(&self) -> &[IntersectionPoint] {
        &self.points
    }

    pub fn perform(&mut self) -> Status {
        if self.range.1 - self.range.0 < self.tol.parametric {
            self.status = Status::NotDone(NotDoneReason::DegenerateOperand);
            return self.status;
        }

        self.status = match (self.curve, self.surface) {
            (Curve::Line(l), Surface::Plane(p)) => self.line_plane(*l, *p),
            (Curve::Line(l), Surface::Sphere(s)) => self.line_quadric(*l, QuadricKind::Sphere(*s)),
            (Curve::Line(l), Surface::Cylinder(c)) => {
                self.line_quadric(*l, QuadricKind::Cylinder(*c))
            }
            (Curve::Circle(c), Surface::Plane(p)) => self.circle_plane(*c, *p),
            _ => Status::NotDone(NotDoneReason::UnsupportedPair),
        };
        order_by_first_parameter(&mut self.points);
        self.status
    }

    fn in_range(&self, t: f64) -> bool {
        t >= self.range.0 - self.tol.parametric && t <= self.range.1 + self.tol.parametric
    }

    fn push(&mut self, t: f64, kind: PointKind, achieved: f64) {
        if self.in_range(t) {
            self.points.push(IntersectionPoint {
                point: self.curve.evaluate(t),
                t1: t,
                t2: 0.0,
                kind,
                achieved_tolerance: achieved.max(self.tol.coincidence),
            });
        }
    }

    fn line_plane(&mut self, line: Line3d, plane: Plane) -> Status {
        let denom = line.direction.dot(&plane.normal);
        let dist = plane.signed_distance(&line.origin);
        if denom.abs() < self.tol.angular {
            if dist.abs() < self.tol.merge_distance() {
                return Status::InfiniteSolutions;
            }
            return Status::Done;
        }
        self.push(-dist / denom, PointKind::Crossing, self.tol.coincidence);
        Status::Done
    }

    fn line_quadric(&mut self, line: Line3d, quadric: QuadricKind) -> Status {
        let merge = self.tol.merge_distance();
        let (a, b, c) = quadric.coefficients(&line);
        if a.abs() < 1e-15 {
            // Line parallel to the quadric's ruling; either misses or lies on it.
            if b.abs() < 1e-15 {
                if c.abs() < merge * merge {
                    return Status::InfiniteSolutions;
                }
                return Status::Done;
            }
            self.push(-c / b, PointKind::Crossing, self.tol.coincidence);
            return Status::Done;
        }

        let disc = b * b - 4.0 * a * c;
        let tangency_band = 4.0 * a.abs() * merge;
        if disc < -tangency_band {
            return Status::Done;
        }
        if disc.abs() <= tangency_band {
            self.push(-b / (2.0 * a), PointKind::Tangent, disc.abs().sqrt() / (2.0 * a.abs()));
            return Status::Done;
        }
        let sq = disc.sqrt();
        self.push((-b - sq) / (2.0 * a), PointKind::Crossing, self.tol.coincidence);
        self.push((-b + sq) / (2.0 * a), PointKind::Crossing, self.tol.coincidence);
        Status::Done
    }

    fn circle_plane(&mut self, circle: Circle3d, plane: Plane) -> Status {
        if circle.radius < self.tol.coincidence {
            return Status::NotDone(NotDoneReason::DegenerateOperand);
        }
        let merge = self.tol.merge_distance();

        if circle.normal.is_parallel_to(&plane.normal, self.tol.angular) {
            if plane.signed_distance(&circle.center).abs() < merge {
                return Status::InfiniteSolutions;
            }
            return Status::Done;
        }

        // Signed distance along the circle is d0 + r*(nx cos t + ny sin t);
        // roots of that sinusoid are the plane crossings.
        let d0 = plane.signed_distance(&circle.center);
        let nx = circle.x_axis.dot(&plane.normal) * circle.radius;
        let ny = circle.normal.cross(&circle.x_axis).dot(&plane.normal) * circle.radius;
        let amp = (nx * nx + ny * ny).sqrt();
        if amp < 1e-15 || d0.abs() > amp + merge {
            return Status::Done;
        }
        let phase = ny.atan2(nx);
        let ratio = (-d0 / amp).clamp(-1.0, 1.0);
        let delta = ratio.acos();
        let tangent = (d0.abs() - amp).abs() < merge;
        for t in [phase + delta, phase - delta] {
            let t = t.rem_euclid(2.0 * std::f64::consts::PI);
            let kind = if tangent {
                PointKind::Tangent
            } else {
                PointKind::Crossing
            };
            self.push(t, kind, self.tol.coincidence);
            if tangent {
                break;
            }
        }
        Status::Done
    }
}

enum QuadricKind {
    Sphere(Sphere),
    Cylinder(Cylinder),
}

impl QuadricKind {
    /// Quadratic coefficients of |closest-approach|^2 - r^2 along the line.
    fn coefficients(&self, line: &Line3d) -> (f64, f64, f64) {
        match self {
            QuadricKind::Sphere(s) => {
                let oc = line.origin - s.center;
                (
                    line.direction.dot(&line.direction),
                    2.0 * oc.dot(&line.direction),
                    oc.dot(&oc) - s.radius * s.radius,
                )
            }
            QuadricKind::Cylinder(c) => {
                let oc = line.origin - c.origin;
                let d_proj = line.direction - c.axis * line.direction.dot(&c.axis);
                let oc_proj = oc - c.axis * oc.dot(&c.axis);
                (
                    d_proj.dot(&d_proj),
                    2.0 * d_proj.dot(&oc_proj),
                    oc_proj.dot(&oc_proj) - c.radius * c.radius,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point3d;
    use crate::geometry::vector::Vec3;

    #[test]
    fn line_pierces_plane_once() {
        let curve = Curve::Line(Line3d::new(Point3d::new(0.0, 0.0, -5.0), Vec3::Z).unwrap());
        let surface = Surface::Plane(Plane::xy());
        let mut ix = CurveSurfaceIntersector::new(&curve, (0.0, 10.0), &surface, Tolerance::default());
        assert_eq!(ix.perform(), Status::Done);
        assert_eq!(ix.points().len(), 1);
        assert!((ix.points()[0].t1 - 5.0).abs() < 1e-12);
    }

    #[test]
    fn line_in_plane_is_infinite() {
        let curve = Curve::Line(Line3d::new(Point3d::ORIGIN, Vec3::X).unwrap());
        let surface = Surface::Plane(Plane::xy());
        let mut ix = CurveSurfaceIntersector::new(&curve, (0.0, 1.0), &surface, Tolerance::default());
        assert_eq!(ix.perform(), Status::InfiniteSolutions);
    }

    #[test]
    fn line_sphere_secant_and_tangent() {
        let sphere = Surface::Sphere(Sphere::new(Point3d::ORIGIN, 1.0));

        let secant = Curve::Line(Line3d::new(Point3d::new(-5.0, 0.0, 0.0), Vec3::X).unwrap());
        let mut ix = CurveSurfaceIntersector::new(&secant, (0.0, 10.0), &sphere, Tolerance::default());
        assert_eq!(ix.perform(), Status::Done);
        assert_eq!(ix.points().len(), 2);
        assert!(ix.points()[0].t1 < ix.points()[1].t1);

        let tangent = Curve::Line(Line3d::new(Point3d::new(-5.0, 1.0, 0.0), Vec3::X).unwrap());
        let mut ix = CurveSurfaceIntersector::new(&tangent, (0.0, 10.0), &sphere, Tolerance::default());
        assert_eq!(ix.perform(), Status::Done);
        assert_eq!(ix.points().len(), 1);
        assert_eq!(ix.points()[0].kind, PointKind::Tangent);
    }

    #[test]
    fn line_cylinder_respects_range() {
        let cyl = Surface::Cylinder(Cylinder::new(Point3d::ORIGIN, Vec3::Z, 1.0));
        let curve = Curve::Line(Line3d::new(Point3d::new(-5.0, 0.0, 0.0), Vec3::X).unwrap());
        // Range covers only the first wall crossing at t = 4.
        let mut ix = CurveSurfaceIntersector::new(&curve, (0.0, 4.5), &cyl, Tolerance::default());
        assert_eq!(ix.perform(), Status::Done);
        assert_eq!(ix.points().len(), 1);
        assert!((ix.points()[0].t1 - 4.0).abs() < 1e-9);
    }

    #[test]
    fn circle_crosses_plane_twice() {
        let circle = Curve::Circle(Circle3d::new(Point3d::ORIGIN, Vec3::X, 1.0));
        let surface = Surface::Plane(Plane::xy());
        let mut ix = CurveSurfaceIntersector::new(
            &circle,
            (0.0, 2.0 * std::f64::consts::PI),
            &surface,
            Tolerance::default(),
        );
        assert_eq!(ix.perform(), Status::Done);
        assert_eq!(ix.points().len(), 2);
        for p in ix.points() {
            assert!(p.point.z.abs() < 1e-9);
            assert!((p.point.distance_to(&Point3d::ORIGIN) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unsupported_pair_is_reported() {
        let circle = Curve::Circle(Circle3d::new(Point3d::ORIGIN, Vec3::Z, 1.0));
        let sphere = Surface::Sphere(Sphere::new(Point3d::ORIGIN, 2.0));
        let mut ix = CurveSurfaceIntersector::new(
            &circle,
            (0.0, 1.0),
            &sphere,
            Tolerance::default(),
        );
        assert_eq!(ix.perform(), Status::NotDone(NotDoneReason::UnsupportedPair));
    }
}
