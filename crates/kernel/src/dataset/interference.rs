use serde::{Deserialize, Serialize};

use crate::geometry::curves::Curve;
use crate::geometry::point::Point3d;

/// Kind of a pairwise interference, named by the dimensions of the two
/// participating sub-shapes (vertex, edge, face).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterferenceKind {
    VV,
    VE,
    EE,
    VF,
    EF,
    FF,
}

/// The common geometric locus of an interference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Locus {
    Point(Point3d),
    Segment(Point3d, Point3d),
    Curve(Curve),
}

/// A record that two sub-shapes meet, with the locus and the tolerance the
/// intersection actually achieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interference {
    pub kind: InterferenceKind,
    /// Dataset indices of the participants; stored with `i1 <= i2` so the
    /// pair is unordered.
    pub i1: usize,
    pub i2: usize,
    pub locus: Locus,
    /// Never smaller than either participant's own tolerance.
    pub tolerance: f64,
}

impl Interference {
    /// Build a record, widening the achieved tolerance to honor the fuzzy
    /// invariant `tolerance >= max(tol(shape1), tol(shape2))`.
    pub fn new(
        kind: InterferenceKind,
        i1: usize,
        i2: usize,
        locus: Locus,
        achieved: f64,
        shape_tol_1: f64,
        shape_tol_2: f64,
    ) -> Self {
        let (i1, i2) = if i1 <= i2 { (i1, i2) } else { (i2, i1) };
        Self {
            kind,
            i1,
            i2,
            locus,
            tolerance: achieved.max(shape_tol_1).max(shape_tol_2),
        }
    }

    pub fn pair(&self) -> (usize, usize) {
        (self.i1, self.i2)
    }

    pub fn involves(&self, index: usize) -> bool {
        self.i1 == index || self.i2 == index
    }
}
