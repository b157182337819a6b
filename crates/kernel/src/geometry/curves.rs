use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;
use super::CurveEval;

/// Analytic curve representations.
///
/// The set is closed on purpose: interference detection dispatches by
/// pattern match, and every variant supports exact closed-form intersection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Curve {
    Line(Line3d),
    Circle(Circle3d),
}

impl Curve {
    pub fn evaluate(&self, t: f64) -> Point3d {
        match self {
            Curve::Line(l) => l.evaluate(t),
            Curve::Circle(c) => c.evaluate(t),
        }
    }

    pub fn derivative(&self, t: f64) -> Vec3 {
        match self {
            Curve::Line(l) => l.direction,
            Curve::Circle(c) => c.derivative(t),
        }
    }

    /// Parameter of the closest point on the curve.
    pub fn project(&self, p: &Point3d) -> f64 {
        match self {
            Curve::Line(l) => l.closest_point(p).1,
            Curve::Circle(c) => c.project(p),
        }
    }
}

impl CurveEval for Curve {
    fn value(&self, t: f64) -> Point3d {
        self.evaluate(t)
    }

    fn derivative(&self, t: f64) -> Vec3 {
        Curve::derivative(self, t)
    }

    fn range(&self) -> (f64, f64) {
        match self {
            Curve::Line(_) => (f64::NEG_INFINITY, f64::INFINITY),
            Curve::Circle(_) => (0.0, 2.0 * std::f64::consts::PI),
        }
    }
}

/// An infinite line defined by a point and a unit direction.
/// Bounded edges restrict it with a parameter range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Line3d {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Line3d {
    pub fn new(origin: Point3d, direction: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.normalized()?,
        })
    }

    /// Line through two distinct points; `None` when they coincide.
    pub fn from_points(a: Point3d, b: Point3d) -> Option<Self> {
        Self::new(a, b - a)
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    pub fn closest_point(&self, p: &Point3d) -> (Point3d, f64) {
        let t = (*p - self.origin).dot(&self.direction);
        (self.evaluate(t), t)
    }

    pub fn distance_to_point(&self, p: &Point3d) -> f64 {
        let (closest, _) = self.closest_point(p);
        p.distance_to(&closest)
    }
}

/// A circle in 3D space with an explicit in-plane reference axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Circle3d {
    pub center: Point3d,
    pub normal: Vec3,
    pub radius: f64,
    /// x-axis of the local frame; angle 0 evaluates along this direction.
    pub x_axis: Vec3,
}

impl Circle3d {
    pub fn new(center: Point3d, normal: Vec3, radius: f64) -> Self {
        let normal = normal.normalized_or(Vec3::Z);
        Self {
            center,
            normal,
            radius,
            x_axis: normal.any_perpendicular(),
        }
    }

    fn y_axis(&self) -> Vec3 {
        self.normal.cross(&self.x_axis)
    }

    /// Evaluate at angle `t` (radians).
    pub fn evaluate(&self, t: f64) -> Point3d {
        self.center
            + self.x_axis * (self.radius * t.cos())
            + self.y_axis() * (self.radius * t.sin())
    }

    pub fn derivative(&self, t: f64) -> Vec3 {
        self.x_axis * (-self.radius * t.sin()) + self.y_axis() * (self.radius * t.cos())
    }

    /// Angle of the in-plane projection of `p`.
    pub fn project(&self, p: &Point3d) -> f64 {
        let v = *p - self.center;
        let x = v.dot(&self.x_axis);
        let y = v.dot(&self.y_axis());
        let angle = y.atan2(x);
        if angle < 0.0 {
            angle + 2.0 * std::f64::consts::PI
        } else {
            angle
        }
    }
}

/// A half-infinite ray, used by the point/solid classifier.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Point3d, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalized_or(Vec3::X),
        }
    }

    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_from_coincident_points_is_none() {
        let p = Point3d::new(1.0, 1.0, 1.0);
        assert!(Line3d::from_points(p, p).is_none());
    }

    #[test]
    fn line_closest_point() {
        let l = Line3d::new(Point3d::ORIGIN, Vec3::X).unwrap();
        let (p, t) = l.closest_point(&Point3d::new(3.0, 4.0, 0.0));
        assert_eq!(t, 3.0);
        assert_eq!(p, Point3d::new(3.0, 0.0, 0.0));
        assert_eq!(l.distance_to_point(&Point3d::new(3.0, 4.0, 0.0)), 4.0);
    }

    #[test]
    fn circle_evaluate_and_project_round_trip() {
        let c = Circle3d::new(Point3d::new(1.0, 0.0, 0.0), Vec3::Z, 2.0);
        for &t in &[0.0, 0.7, 2.0, 5.5] {
            let p = c.evaluate(t);
            assert!((c.project(&p) - t).abs() < 1e-12);
            assert!((p.distance_to(&c.center) - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn circle_derivative_is_tangent() {
        let c = Circle3d::new(Point3d::ORIGIN, Vec3::Z, 1.5);
        let t = 1.2;
        let radial = c.evaluate(t) - c.center;
        assert!(radial.dot(&c.derivative(t)).abs() < 1e-12);
    }
}
