// ============================================================
// Layer 4 — Time-Based Train/Test Splitter
// ============================================================
// Partitions each user's history chronologically:
//   - Training set: the user's earlier ratings
//   - Test set:     the user's latest ratings
//
// A random split would let a model train on ratings made
// after the ones it is evaluated on. Splitting per user by
// time keeps every test rating at or after every training
// rating of the same user.
//
// Per user with n ratings:
//   k = max(1, floor(n * test_ratio))
//   the last k ratings (by time) → test
//   the first n - k ratings      → train
//
// Users with fewer than `min_events_per_user` ratings are
// dropped from both sets. Every remaining user has at least
// one test row, even when n * test_ratio < 1.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::error::PipelineError;
use crate::domain::rating::MergedRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of each user's ratings held out, in (0, 1)
    pub test_ratio: f64,
    /// Users with fewer ratings than this are dropped, >= 1
    pub min_events_per_user: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio:          0.2,
            min_events_per_user: 5,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.min_events_per_user == 0 {
            return Err(PipelineError::InvalidConfig(
                "min_events_per_user must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of a user's `n` ratings that go to the test set.
    pub fn test_count(&self, n: usize) -> usize {
        ((n as f64 * self.test_ratio).floor() as usize).max(1)
    }
}

/// Train and test partitions plus how many users each policy kept.
#[derive(Debug, Clone, Default)]
pub struct Split {
    pub train:         Vec<MergedRecord>,
    pub test:          Vec<MergedRecord>,
    pub kept_users:    usize,
    pub dropped_users: usize,
}

/// Split `records` per user by time.
///
/// # Arguments
/// * `records` - The full merged table
/// * `cfg`     - Test ratio and minimum activity
///
/// # Returns
/// A `Split` whose partitions list users in ascending `u_index`
/// order, each user's rows in ascending time. Rows with equal
/// timestamps keep their input order.
pub fn time_based_split(records: &[MergedRecord], cfg: &SplitConfig) -> Result<Split, PipelineError> {
    cfg.validate()?;

    // Group rows by user; BTreeMap keeps users in u_index order
    let mut by_user: BTreeMap<usize, Vec<&MergedRecord>> = BTreeMap::new();
    for rec in records {
        by_user.entry(rec.u_index).or_default().push(rec);
    }

    let mut split = Split::default();

    for (_, mut rows) in by_user {
        if rows.len() < cfg.min_events_per_user {
            split.dropped_users += 1;
            continue;
        }

        // sort_by_key is stable, so ties stay in input order
        rows.sort_by_key(|r| r.timestamp);

        let k = cfg.test_count(rows.len());
        let (train, test) = rows.split_at(rows.len() - k);

        split.train.extend(train.iter().map(|&r| r.clone()));
        split.test.extend(test.iter().map(|&r| r.clone()));
        split.kept_users += 1;
    }

    tracing::info!(
        "Split: {} train, {} test rows over {} users ({} users below {} events dropped)",
        split.train.len(),
        split.test.len(),
        split.kept_users,
        split.dropped_users,
        cfg.min_events_per_user,
    );

    Ok(split)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::collections::HashMap;

    fn rec(u_index: usize, m_index: usize, ts: i64) -> MergedRecord {
        MergedRecord {
            user_id:   u_index as i64 + 1000,
            movie_id:  m_index as i64 + 1,
            u_index,
            m_index,
            rating:    3.0,
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            title:     format!("Movie {m_index}"),
            genres:    "Drama".to_string(),
        }
    }

    fn user_rows(u_index: usize, timestamps: &[i64]) -> Vec<MergedRecord> {
        timestamps
            .iter()
            .enumerate()
            .map(|(m, &ts)| rec(u_index, m, ts))
            .collect()
    }

    #[test]
    fn test_six_ratings_gives_five_train_one_test() {
        let records = user_rows(0, &[3, 1, 6, 2, 5, 4]);
        let split = time_based_split(&records, &SplitConfig::default()).unwrap();

        assert_eq!(split.train.len(), 5);
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.test[0].timestamp.timestamp(), 6);
        let train_ts: Vec<i64> = split.train.iter().map(|r| r.timestamp.timestamp()).collect();
        assert_eq!(train_ts, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_exactly_min_events_gives_four_train_one_test() {
        let records = user_rows(0, &[1, 2, 3, 4, 5]);
        let split = time_based_split(&records, &SplitConfig::default()).unwrap();

        assert_eq!(split.train.len(), 4);
        assert_eq!(split.test.len(), 1);
    }

    #[test]
    fn test_user_below_minimum_is_dropped() {
        let records = user_rows(0, &[1, 2, 3, 4]);
        let split = time_based_split(&records, &SplitConfig::default()).unwrap();

        assert!(split.train.is_empty());
        assert!(split.test.is_empty());
        assert_eq!(split.dropped_users, 1);
        assert_eq!(split.kept_users, 0);
    }

    #[test]
    fn test_no_temporal_leakage_and_min_test_row() {
        let mut records = Vec::new();
        records.extend(user_rows(0, &[50, 10, 40, 20, 30, 60, 70, 80, 90, 15, 25]));
        records.extend(user_rows(1, &[5, 4, 3, 2, 1]));
        records.extend(user_rows(2, &[9, 9, 9, 9, 9, 9, 9]));
        let split = time_based_split(&records, &SplitConfig::default()).unwrap();

        let mut max_train: HashMap<usize, i64> = HashMap::new();
        let mut min_test: HashMap<usize, i64> = HashMap::new();
        for r in &split.train {
            let e = max_train.entry(r.u_index).or_insert(i64::MIN);
            *e = (*e).max(r.timestamp.timestamp());
        }
        for r in &split.test {
            let e = min_test.entry(r.u_index).or_insert(i64::MAX);
            *e = (*e).min(r.timestamp.timestamp());
        }

        for u in 0..3 {
            assert!(min_test.contains_key(&u), "user {u} has no test row");
            assert!(max_train[&u] <= min_test[&u], "user {u} leaks");
        }
        // 11 ratings * 0.2 = 2.2 → 2 test rows
        assert_eq!(split.test.iter().filter(|r| r.u_index == 0).count(), 2);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let mut records = user_rows(0, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        records.extend(user_rows(1, &[1, 2]));
        let split = time_based_split(&records, &SplitConfig::default()).unwrap();

        // User 1 dropped; all 10 of user 0's rows land in exactly one partition
        assert_eq!(split.train.len() + split.test.len(), 10);
        for t in &split.test {
            assert!(!split.train.contains(t));
        }
    }

    #[test]
    fn test_users_ordered_by_index() {
        let mut records = user_rows(1, &[1, 2, 3, 4, 5]);
        records.extend(user_rows(0, &[1, 2, 3, 4, 5]));
        let split = time_based_split(&records, &SplitConfig::default()).unwrap();

        let order: Vec<usize> = split.test.iter().map(|r| r.u_index).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_single_row_user_with_min_one() {
        let cfg = SplitConfig { test_ratio: 0.2, min_events_per_user: 1 };
        let records = user_rows(0, &[42]);
        let split = time_based_split(&records, &cfg).unwrap();

        assert!(split.train.is_empty());
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.kept_users, 1);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = user_rows(0, &[7, 7, 7, 7, 7]);
        let split = time_based_split(&records, &SplitConfig::default()).unwrap();

        let train_items: Vec<usize> = split.train.iter().map(|r| r.m_index).collect();
        assert_eq!(train_items, vec![0, 1, 2, 3]);
        assert_eq!(split.test[0].m_index, 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad_ratio = SplitConfig { test_ratio: 1.0, min_events_per_user: 5 };
        let bad_min   = SplitConfig { test_ratio: 0.2, min_events_per_user: 0 };
        assert!(time_based_split(&[], &bad_ratio).is_err());
        assert!(time_based_split(&[], &bad_min).is_err());
    }

    #[test]
    fn test_empty_dataset() {
        let split = time_based_split(&[], &SplitConfig::default()).unwrap();
        assert!(split.train.is_empty());
        assert!(split.test.is_empty());
    }
}
