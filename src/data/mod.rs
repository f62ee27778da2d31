// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw `.dat` logs to model-ready artifacts.
//
// The pipeline flows in this order:
//
//   ratings.dat + movies.dat
//       │
//       ▼
//   MovieLensLoader   → parses `::`-separated rows into typed tables
//       │
//       ▼
//   Cleaner           → left join, drop incomplete and out-of-range rows,
//       │               timestamps, dense u_index / m_index
//       ├──────────────► Genre expander → one row per (item, genre)
//       ▼
//   Splitter          → per-user chronological train / test
//       │
//       ▼
//   Matrix builder    → sparse item × user matrix (train only,
//       │               global shape) + user / item maps
//       ▼
//   Feature builder   → labelled (user, item) pairs for the ranker
//
// Every step is a pure function of its inputs and is tested
// on its own.

/// Parses the raw `::`-delimited MovieLens files
pub mod loader;

/// Joins, filters and indexes the raw tables
pub mod cleaner;

/// Explodes pipe-delimited genres into one row per genre
pub mod genres;

/// Per-user time-based train / test split
pub mod splitter;

/// Sparse item × user interaction matrix and id maps
pub mod matrix;

/// Candidate pairs and features for the hybrid ranker
pub mod features;
