use std::collections::{HashMap, HashSet};

use crate::dataset::SubShape;

/// Provenance map handed back with a Boolean result: for each input
/// sub-shape (by dataset index), what became of it.
#[derive(Debug, Clone, Default)]
pub struct History {
    modified: HashMap<usize, Vec<SubShape>>,
    generated: HashMap<usize, Vec<SubShape>>,
    deleted: HashSet<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `index` was replaced by `replacement` in the result.
    pub fn add_modified(&mut self, index: usize, replacement: SubShape) {
        self.modified.entry(index).or_default().push(replacement);
        self.deleted.remove(&index);
    }

    /// Record that `index` gave rise to a new shape (e.g. a section edge).
    pub fn add_generated(&mut self, index: usize, new_shape: SubShape) {
        self.generated.entry(index).or_default().push(new_shape);
    }

    /// Record that `index` has no counterpart in the result.
    ///
    /// A later `add_modified` for the same index overrides the deletion.
    pub fn set_deleted(&mut self, index: usize) {
        if !self.modified.contains_key(&index) {
            self.deleted.insert(index);
        }
    }

    pub fn modified(&self, index: usize) -> &[SubShape] {
        self.modified.get(&index).map_or(&[], Vec::as_slice)
    }

    pub fn generated(&self, index: usize) -> &[SubShape] {
        self.generated.get(&index).map_or(&[], Vec::as_slice)
    }

    pub fn is_deleted(&self, index: usize) -> bool {
        self.deleted.contains(&index)
    }

    pub fn modified_count(&self) -> usize {
        self.modified.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    use crate::topology::brep::EdgeId;

    fn edge(n: u64) -> SubShape {
        SubShape::Edge(EdgeId::from(KeyData::from_ffi(n | (1 << 32))))
    }

    #[test]
    fn modified_overrides_deleted() {
        let mut h = History::new();
        h.set_deleted(3);
        assert!(h.is_deleted(3));
        h.add_modified(3, edge(1));
        assert!(!h.is_deleted(3));
        assert_eq!(h.modified(3).len(), 1);
        // A deletion after a modification is ignored.
        h.set_deleted(3);
        assert!(!h.is_deleted(3));
    }

    #[test]
    fn untouched_index_has_empty_lists() {
        let h = History::new();
        assert!(h.modified(9).is_empty());
        assert!(h.generated(9).is_empty());
        assert!(!h.is_deleted(9));
    }
}
