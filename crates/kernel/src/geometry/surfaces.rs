use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;
use super::SurfaceEval;

/// Analytic surface representations, closed for pattern-matched dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Surface {
    Plane(Plane),
    Cylinder(Cylinder),
    Sphere(Sphere),
    Cone(Cone),
}

impl Surface {
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        match self {
            Surface::Plane(p) => p.evaluate(u, v),
            Surface::Cylinder(c) => c.evaluate(u, v),
            Surface::Sphere(s) => s.evaluate(u, v),
            Surface::Cone(c) => c.evaluate(u, v),
        }
    }

    pub fn normal_at(&self, u: f64, v: f64) -> Vec3 {
        match self {
            Surface::Plane(p) => p.normal,
            Surface::Cylinder(c) => c.normal_at(u, v),
            Surface::Sphere(s) => s.normal_at(u, v),
            Surface::Cone(c) => c.normal_at(u, v),
        }
    }

    pub fn is_planar(&self) -> bool {
        matches!(self, Surface::Plane(_))
    }
}

impl SurfaceEval for Surface {
    fn value(&self, u: f64, v: f64) -> Point3d {
        self.evaluate(u, v)
    }

    fn normal(&self, u: f64, v: f64) -> Vec3 {
        self.normal_at(u, v)
    }

    fn ranges(&self) -> ((f64, f64), (f64, f64)) {
        let two_pi = 2.0 * std::f64::consts::PI;
        match self {
            Surface::Plane(_) => (
                (f64::NEG_INFINITY, f64::INFINITY),
                (f64::NEG_INFINITY, f64::INFINITY),
            ),
            Surface::Cylinder(_) => ((0.0, two_pi), (f64::NEG_INFINITY, f64::INFINITY)),
            Surface::Sphere(_) => (
                (0.0, two_pi),
                (-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2),
            ),
            Surface::Cone(_) => ((0.0, two_pi), (f64::NEG_INFINITY, f64::INFINITY)),
        }
    }
}

/// An infinite plane with an explicit in-plane frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3d,
    pub normal: Vec3,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
}

impl Plane {
    pub fn new(origin: Point3d, normal: Vec3) -> Self {
        let normal = normal.normalized_or(Vec3::Z);
        let u_axis = normal.any_perpendicular();
        let v_axis = normal.cross(&u_axis);
        Self {
            origin,
            normal,
            u_axis,
            v_axis,
        }
    }

    pub fn xy() -> Self {
        Self {
            origin: Point3d::ORIGIN,
            normal: Vec3::Z,
            u_axis: Vec3::X,
            v_axis: Vec3::Y,
        }
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        self.origin + self.u_axis * u + self.v_axis * v
    }

    /// Signed distance; positive on the normal side.
    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.normal)
    }

    pub fn project_point(&self, p: &Point3d) -> Point3d {
        *p - self.normal * self.signed_distance(p)
    }

    /// In-plane `(u, v)` parameters of the projection of `p`.
    pub fn parameters_of(&self, p: &Point3d) -> (f64, f64) {
        let v = *p - self.origin;
        (v.dot(&self.u_axis), v.dot(&self.v_axis))
    }

    /// Same geometric locus, regardless of frame or normal sign.
    pub fn same_locus(&self, other: &Plane, coincidence: f64, angular: f64) -> bool {
        self.normal.is_parallel_to(&other.normal, angular)
            && self.signed_distance(&other.origin).abs() < coincidence
    }
}

/// An infinite cylinder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cylinder {
    pub origin: Point3d,
    pub axis: Vec3,
    pub radius: f64,
    pub ref_dir: Vec3,
}

impl Cylinder {
    pub fn new(origin: Point3d, axis: Vec3, radius: f64) -> Self {
        let axis = axis.normalized_or(Vec3::Z);
        Self {
            origin,
            axis,
            radius,
            ref_dir: axis.any_perpendicular(),
        }
    }

    /// Evaluate at (u = angle, v = height along axis).
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        let y_dir = self.axis.cross(&self.ref_dir);
        self.origin
            + self.ref_dir * (self.radius * u.cos())
            + y_dir * (self.radius * u.sin())
            + self.axis * v
    }

    pub fn normal_at(&self, u: f64, _v: f64) -> Vec3 {
        let y_dir = self.axis.cross(&self.ref_dir);
        self.ref_dir * u.cos() + y_dir * u.sin()
    }

    pub fn distance_to_axis(&self, p: &Point3d) -> f64 {
        let v = *p - self.origin;
        (v - self.axis * v.dot(&self.axis)).length()
    }
}

/// A sphere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Point3d,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point3d, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Evaluate at (u = longitude, v = latitude).
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        self.center
            + Vec3::new(
                self.radius * v.cos() * u.cos(),
                self.radius * v.cos() * u.sin(),
                self.radius * v.sin(),
            )
    }

    pub fn normal_at(&self, u: f64, v: f64) -> Vec3 {
        (self.evaluate(u, v) - self.center).normalized_or(Vec3::Z)
    }
}

/// An infinite double cone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cone {
    pub apex: Point3d,
    pub axis: Vec3,
    pub half_angle: f64,
    pub ref_dir: Vec3,
}

impl Cone {
    pub fn new(apex: Point3d, axis: Vec3, half_angle: f64) -> Self {
        let axis = axis.normalized_or(Vec3::Z);
        Self {
            apex,
            axis,
            half_angle,
            ref_dir: axis.any_perpendicular(),
        }
    }

    /// Evaluate at (u = angle, v = distance along axis from apex).
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        let y_dir = self.axis.cross(&self.ref_dir);
        let r = v * self.half_angle.tan();
        self.apex + self.axis * v + self.ref_dir * (r * u.cos()) + y_dir * (r * u.sin())
    }

    pub fn normal_at(&self, u: f64, v: f64) -> Vec3 {
        let y_dir = self.axis.cross(&self.ref_dir);
        let radial = self.ref_dir * u.cos() + y_dir * u.sin();
        let axis_sign = if v >= 0.0 { 1.0 } else { -1.0 };
        (radial * self.half_angle.cos() - self.axis * (self.half_angle.sin() * axis_sign))
            .normalized_or(self.axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_signed_distance_and_projection() {
        let p = Plane::xy();
        let q = Point3d::new(1.0, 2.0, 5.0);
        assert_eq!(p.signed_distance(&q), 5.0);
        assert_eq!(p.project_point(&q), Point3d::new(1.0, 2.0, 0.0));
        let (u, v) = p.parameters_of(&q);
        assert_eq!((u, v), (1.0, 2.0));
    }

    #[test]
    fn plane_same_locus_ignores_normal_sign() {
        let a = Plane::new(Point3d::new(0.0, 0.0, 1.0), Vec3::Z);
        let b = Plane::new(Point3d::new(5.0, 5.0, 1.0), -Vec3::Z);
        assert!(a.same_locus(&b, 1e-7, 1e-10));
        let c = Plane::new(Point3d::new(0.0, 0.0, 1.1), Vec3::Z);
        assert!(!a.same_locus(&c, 1e-7, 1e-10));
    }

    #[test]
    fn cylinder_evaluation_stays_on_radius() {
        let c = Cylinder::new(Point3d::ORIGIN, Vec3::Z, 2.0);
        for &(u, v) in &[(0.0, 0.0), (1.0, 3.0), (4.0, -2.0)] {
            assert!((c.distance_to_axis(&c.evaluate(u, v)) - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn sphere_normal_is_radial() {
        let s = Sphere::new(Point3d::new(1.0, 1.0, 1.0), 3.0);
        let n = s.normal_at(0.5, 0.3);
        let p = s.evaluate(0.5, 0.3);
        assert!((p - s.center).normalized_or(Vec3::X).dot(&n) > 1.0 - 1e-12);
    }

    #[test]
    fn cone_evaluation_matches_half_angle() {
        let cone = Cone::new(Point3d::ORIGIN, Vec3::Z, std::f64::consts::FRAC_PI_4);
        let p = cone.evaluate(0.0, 2.0);
        // At 45 degrees the radius equals the height.
        assert!((p.x - 2.0).abs() < 1e-12);
        assert!((p.z - 2.0).abs() < 1e-12);
    }
}
