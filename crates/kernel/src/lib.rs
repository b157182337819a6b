pub mod geometry;
pub mod intersect;
pub mod topology;
pub mod dataset;
pub mod algo;
pub mod build;
pub mod analyze;

// Re-export key types at crate root for convenience.
pub use algo::{BoolOp, BooleanEngine, BooleanOperation, DefaultBooleanEngine};
pub use analyze::ArgumentAnalyzer;
pub use dataset::IntersectionDataset;
pub use geometry::{CurveEval, SurfaceEval};
pub use topology::shape::Shape;

/// Global tolerance configuration for geometric comparisons.
///
/// Every topological decision (coincidence, zero length, parallelism) routes
/// through one of these thresholds; the `fuzzy` value widens `coincidence`
/// for a single Boolean call so that "touching" is tolerance-relative.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Points closer than this are considered coincident.
    pub coincidence: f64,
    /// Angles smaller than this (radians) are considered zero.
    pub angular: f64,
    /// Parameter-space tolerance for curve/surface evaluations.
    pub parametric: f64,
    /// Extra widening applied on top of per-shape tolerances for one
    /// Boolean operation. Zero by default.
    pub fuzzy: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            coincidence: 1e-7,
            angular: 1e-10,
            parametric: 1e-9,
            fuzzy: 0.0,
        }
    }
}

impl Tolerance {
    /// Tolerance with an additional fuzzy widening for one operation.
    pub fn with_fuzzy(fuzzy: f64) -> Self {
        Self {
            fuzzy: fuzzy.max(0.0),
            ..Self::default()
        }
    }

    /// The effective coincidence threshold including fuzzy widening.
    pub fn merge_distance(&self) -> f64 {
        self.coincidence + self.fuzzy
    }

    pub fn points_coincident(
        &self,
        a: &geometry::point::Point3d,
        b: &geometry::point::Point3d,
    ) -> bool {
        a.distance_to(b) < self.merge_distance()
    }

    pub fn is_zero_length(&self, length: f64) -> bool {
        length.abs() < self.merge_distance()
    }

    pub fn is_zero_angle(&self, angle: f64) -> bool {
        angle.abs() < self.angular
    }
}

/// Default tolerance used when a caller does not supply one.
pub fn default_tolerance() -> Tolerance {
    Tolerance::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point3d;

    #[test]
    fn fuzzy_widens_coincidence() {
        let strict = Tolerance::default();
        let fuzzy = Tolerance::with_fuzzy(0.01);
        let a = Point3d::new(0.0, 0.0, 0.0);
        let b = Point3d::new(0.005, 0.0, 0.0);
        assert!(!strict.points_coincident(&a, &b));
        assert!(fuzzy.points_coincident(&a, &b));
    }

    #[test]
    fn negative_fuzzy_is_clamped() {
        let tol = Tolerance::with_fuzzy(-1.0);
        assert_eq!(tol.fuzzy, 0.0);
    }
}
