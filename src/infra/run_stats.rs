// ============================================================
// Layer 6 — Run Stats
// ============================================================
// Counters recorded once per pipeline run and written to
// run_stats.json next to the artifacts.
//
// Example:
//   {
//     "raw_events": 1000209,
//     "merged_rows": 1000209,
//     "n_users": 6040,
//     "n_items": 3706,
//     "train_rows": 797758,
//     "test_rows": 202451,
//     ...
//   }
//
// How to read them:
//   - merged_rows much smaller than raw_events → check the
//     catalog join and rating bounds (the dropped_* counters)
//   - dropped_users large → min_events_per_user is too strict
//     for this dataset
//   - matrix_nnz below train_rows → duplicate (item, user)
//     pairs were summed into one cell

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::cleaner::CleanStats;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,

    pub raw_events:   usize,
    pub catalog_rows: usize,

    pub merged_rows:                 usize,
    pub dropped_unmatched:           usize,
    pub dropped_missing_fields:      usize,
    pub dropped_rating_out_of_range: usize,
    pub n_users:                     usize,
    pub n_items:                     usize,

    pub genre_rows: usize,

    pub train_rows:    usize,
    pub test_rows:     usize,
    pub kept_users:    usize,
    pub dropped_users: usize,

    pub matrix_rows: usize,
    pub matrix_cols: usize,
    pub matrix_nnz:  usize,

    pub ranker_pairs: usize,
}

impl RunStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self { started_at: Some(started_at), ..Self::default() }
    }

    pub fn record_clean(&mut self, stats: &CleanStats) {
        self.dropped_unmatched           = stats.unmatched_events;
        self.dropped_missing_fields      = stats.missing_fields;
        self.dropped_rating_out_of_range = stats.rating_out_of_range;
    }

    /// Share of split rows that ended up in test, 0.0 when nothing was split.
    pub fn test_fraction(&self) -> f64 {
        let total = self.train_rows + self.test_rows;
        if total == 0 {
            0.0
        } else {
            self.test_rows as f64 / total as f64
        }
    }

    /// Density of the interaction matrix, 0.0 for an empty shape.
    pub fn matrix_density(&self) -> f64 {
        let cells = self.matrix_rows * self.matrix_cols;
        if cells == 0 {
            0.0
        } else {
            self.matrix_nnz as f64 / cells as f64
        }
    }

    pub fn log(&self) {
        tracing::info!(
            "Run finished in {} ms: {} → {} rows, {} users x {} items, {} train / {} test ({:.1}% test), matrix density {:.5}",
            self.elapsed_ms,
            self.raw_events,
            self.merged_rows,
            self.n_users,
            self.n_items,
            self.train_rows,
            self.test_rows,
            self.test_fraction() * 100.0,
            self.matrix_density(),
        );
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractions_handle_empty_runs() {
        let stats = RunStats::default();
        assert_eq!(stats.test_fraction(), 0.0);
        assert_eq!(stats.matrix_density(), 0.0);
    }

    #[test]
    fn test_fractions() {
        let stats = RunStats {
            train_rows:  80,
            test_rows:   20,
            matrix_rows: 10,
            matrix_cols: 10,
            matrix_nnz:  25,
            ..RunStats::default()
        };
        assert!((stats.test_fraction() - 0.2).abs() < 1e-12);
        assert!((stats.matrix_density() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_record_clean_copies_counters() {
        let mut stats = RunStats::default();
        stats.record_clean(&CleanStats {
            unmatched_events:    3,
            missing_fields:      2,
            rating_out_of_range: 1,
        });
        assert_eq!(stats.dropped_unmatched, 3);
        assert_eq!(stats.dropped_missing_fields, 2);
        assert_eq!(stats.dropped_rating_out_of_range, 1);
    }
}
