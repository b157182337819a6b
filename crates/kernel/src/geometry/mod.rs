pub mod point;
pub mod vector;
pub mod transform;
pub mod curves;
pub mod surfaces;
pub mod intersection;

use self::point::Point3d;
use self::vector::Vec3;

/// Uniform evaluation interface over heterogeneous curve geometry.
///
/// Everything downstream of the adaptor layer (elementary intersection, the
/// interference filler, classification) talks to curves through this trait
/// rather than matching on concrete kinds.
pub trait CurveEval {
    /// Point at parameter `t`.
    fn value(&self, t: f64) -> Point3d;

    /// First derivative at parameter `t`.
    fn derivative(&self, t: f64) -> Vec3;

    /// Natural parameter range `[first, last]`.
    fn range(&self) -> (f64, f64);
}

/// Uniform evaluation interface over heterogeneous surface geometry.
pub trait SurfaceEval {
    /// Point at parameters `(u, v)`.
    fn value(&self, u: f64, v: f64) -> Point3d;

    /// Outward normal at `(u, v)`.
    fn normal(&self, u: f64, v: f64) -> Vec3;

    /// Natural parameter ranges `((u0, u1), (v0, v1))`.
    fn ranges(&self) -> ((f64, f64), (f64, f64));
}
