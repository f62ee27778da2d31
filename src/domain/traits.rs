// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams of the system. The pipeline only ever sees these
// traits, never a concrete loader or model:
//
//   RatingSource  → where raw events and catalog rows come from
//   Recommender   → collaborative-filtering model:
//                   "top-N items for this user's rating row"
//   Ranker        → learned ranker:
//                   "one score per feature row"
//   Persistable   → anything whose state round-trips to disk
//
// Trained models live outside this crate; anything that
// implements Recommender or Ranker can be plugged into the
// recommendation reader, including test stubs.

use std::path::Path;

use anyhow::Result;

use crate::domain::rating::RawTables;

// ─── RatingSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the raw event and catalog tables.
///
/// Implementations:
///   - MovieLensLoader → `ratings.dat` / `movies.dat` with `::` separators
pub trait RatingSource {
    fn load(&self) -> Result<RawTables>;
}

// ─── Sparse rows ──────────────────────────────────────────────────────────────
/// One row of a sparse matrix: parallel column indices and values,
/// indices ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRow {
    pub indices: Vec<usize>,
    pub values:  Vec<f32>,
}

impl SparseRow {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }
}

/// An item index with the score a model gave it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub m_index: usize,
    pub score:   f32,
}

// ─── Recommender ──────────────────────────────────────────────────────────────
/// A collaborative-filtering model over the dense user/item index space.
///
/// Implementations:
///   - PopularityRecommender → train interaction counts
///   - (external) factorization models trained on `item_user_train.mtx`
pub trait Recommender {
    /// Number of users the model was fit on. Users at or beyond this
    /// index get no recommendations.
    fn num_users(&self) -> usize;

    /// Rank items for `u_index` given that user's row of the
    /// user × item matrix. Best first, at most `top_n` entries.
    fn recommend(
        &self,
        u_index:  usize,
        user_row: &SparseRow,
        top_n:    usize,
    ) -> Result<Vec<ScoredItem>>;
}

// ─── Ranker ───────────────────────────────────────────────────────────────────
/// A learned ranker scoring (user, item) candidate feature rows.
///
/// Implementations:
///   - LinearRanker → weighted sum of features
///   - (external) gradient-boosted models
pub trait Ranker {
    /// Return one score per row, in row order.
    fn predict(&self, feature_rows: &[Vec<f32>]) -> Result<Vec<f32>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
pub trait Persistable: Sized {
    fn save(&self, path: &Path) -> Result<()>;

    fn load(path: &Path) -> Result<Self>;
}
