//! Curve/curve, curve/surface and surface/surface intersection at controlled
//! tolerance.
//!
//! Every engine distinguishes "no intersection" (`Status::Done` with an empty
//! point list) from "cannot determine" (`Status::NotDone`) and from coincident
//! operands (`Status::InfiniteSolutions`), and reports the tolerance actually
//! achieved so the caller can widen downstream shape tolerances.

pub mod curve_curve;
pub mod curve_surface;
pub mod surface_surface;

pub use curve_curve::CurveCurveIntersector;
pub use curve_surface::CurveSurfaceIntersector;
pub use surface_surface::{surface_surface, SurfaceSection};

use serde::{Deserialize, Serialize};

use crate::geometry::point::Point3d;

/// Outcome of an intersection computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Computation finished; the point/segment list is the full answer
    /// (possibly empty, meaning no intersection).
    Done,
    /// The computation could not be completed.
    NotDone(NotDoneReason),
    /// Operands are coincident over an interval; there is no finite
    /// point list to return.
    InfiniteSolutions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotDoneReason {
    /// An operand is degenerate (zero-length curve, zero radius).
    DegenerateOperand,
    /// The requested precision could not be reached.
    ToleranceNotAchieved,
    /// The operand pair has no analytic treatment in this kernel.
    UnsupportedPair,
}

/// Tangency vs transversal crossing; downstream orientation logic differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    Crossing,
    Tangent,
}

/// A single intersection point with parameters on both operands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionPoint {
    pub point: Point3d,
    /// Parameter on the first operand.
    pub t1: f64,
    /// Parameter on the second operand (curve parameter, or meaningless
    /// for a surface operand).
    pub t2: f64,
    pub kind: PointKind,
    /// The precision actually reached; may exceed the requested precision,
    /// in which case the engine reports `ToleranceNotAchieved` instead.
    pub achieved_tolerance: f64,
}

/// Sort intersection points by parameter on the first operand.
pub(crate) fn order_by_first_parameter(points: &mut [IntersectionPoint]) {
    points.sort_by(|a, b| a.t1.partial_cmp(&b.t1).unwrap_or(std::cmp::Ordering::Equal));
}
