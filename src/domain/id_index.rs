// ============================================================
// Layer 3 — Dense Id Index
// ============================================================
// Maps arbitrary raw ids to contiguous indices 0..n in order
// of first occurrence, and back again.
//
// One IdIndex is built per entity (users, items) per run and
// handed explicitly to every stage that needs it. Indices are
// stable within a run; a run over differently ordered input
// may assign different indices.

use std::collections::HashMap;

use crate::domain::rating::RawId;

/// Two-way raw id <-> dense index mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdIndex {
    dense: HashMap<RawId, usize>,
    raw:   Vec<RawId>,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factorize a sequence of raw ids in first-occurrence order.
    pub fn from_raw_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = RawId>,
    {
        let mut index = Self::new();
        for id in ids {
            index.insert(id);
        }
        index
    }

    /// Return the dense index of `raw`, assigning the next free one
    /// if the id has not been seen yet.
    pub fn insert(&mut self, raw: RawId) -> usize {
        if let Some(&idx) = self.dense.get(&raw) {
            return idx;
        }
        let idx = self.raw.len();
        self.dense.insert(raw, idx);
        self.raw.push(raw);
        idx
    }

    pub fn dense(&self, raw: RawId) -> Option<usize> {
        self.dense.get(&raw).copied()
    }

    pub fn raw(&self, dense: usize) -> Option<RawId> {
        self.raw.get(dense).copied()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// (dense, raw) pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, RawId)> + '_ {
        self.raw.iter().copied().enumerate()
    }
}
