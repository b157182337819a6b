use serde::{Deserialize, Serialize};

/// A split marker on an edge's parameter line.
///
/// `vertex` is the dataset index of the vertex sitting at the split point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pave {
    pub vertex: usize,
    pub t: f64,
    pub tolerance: f64,
}

/// A maximal sub-interval of an edge between two consecutive paves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaveBlock {
    /// Dataset index of the source edge.
    pub edge: usize,
    pub pave1: Pave,
    pub pave2: Pave,
}

impl PaveBlock {
    pub fn range(&self) -> (f64, f64) {
        (self.pave1.t, self.pave2.t)
    }
}

/// The ordered pave collection of one edge.
///
/// Paves are kept strictly increasing in parameter. Inserting a pave within
/// parametric tolerance of an existing one widens that pave's tolerance
/// instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaveSet {
    edge: usize,
    paves: Vec<Pave>,
}

impl PaveSet {
    /// A fresh set seeded with the edge's two boundary paves.
    pub fn new(edge: usize, start: Pave, end: Pave) -> Self {
        debug_assert!(start.t < end.t);
        Self {
            edge,
            paves: vec![start, end],
        }
    }

    pub fn edge(&self) -> usize {
        self.edge
    }

    pub fn paves(&self) -> &[Pave] {
        &self.paves
    }

    /// Number of paves strictly between the edge boundaries.
    pub fn interior_count(&self) -> usize {
        self.paves.len().saturating_sub(2)
    }

    /// Insert a pave, keeping strict parameter order.
    ///
    /// Returns the index of the pave that now represents the split point
    /// (either the new one or the widened existing one).
    pub fn insert(&mut self, pave: Pave, parametric_tol: f64) -> usize {
        for (i, existing) in self.paves.iter_mut().enumerate() {
            if (existing.t - pave.t).abs() <= parametric_tol {
                existing.tolerance = existing.tolerance.max(pave.tolerance);
                return i;
            }
        }
        let pos = self
            .paves
            .partition_point(|existing| existing.t < pave.t);
        self.paves.insert(pos, pave);
        pos
    }

    /// True when parameters are strictly increasing.
    pub fn is_strictly_ordered(&self) -> bool {
        self.paves.windows(2).all(|w| w[0].t < w[1].t)
    }

    /// The maximal blocks between consecutive paves.
    ///
    /// Concatenating the block ranges reconstructs the edge's full
    /// `[first, last]` range with no gaps and no overlaps.
    pub fn blocks(&self) -> Vec<PaveBlock> {
        self.paves
            .windows(2)
            .map(|w| PaveBlock {
                edge: self.edge,
                pave1: w[0],
                pave2: w[1],
            })
            .collect()
    }
}
