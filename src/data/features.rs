// ============================================================
// Layer 4 — Ranker Feature Builder
// ============================================================
// Produces the labelled (user, item) candidate table that the
// hybrid ranker is trained on and scored against.
//
// Candidates per user that has test rows:
//   label 1 → every distinct item in the user's test rows
//   label 0 → items the user never rated anywhere in the
//             merged table, sampled without replacement
//             (negatives_per_positive per positive)
//
// Features come from the TRAIN partition only, so nothing a
// test label depends on leaks into its own features:
//
//   item_train_count     ratings of the item in train
//   item_mean_rating     mean train rating of the item
//   user_train_count     ratings by the user in train
//   user_mean_rating     mean train rating by the user
//   user_genre_affinity  share of the user's train ratings
//                        that fall in the item's genres
//                        (averaged over the item's genres)
//   item_genre_count     number of genres of the item
//   item_cf_similarity   cosine between the item's train raters
//                        and the user's train neighbourhood
//                        (other users who rated the same items,
//                        weighted by how many they share)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::data::matrix::{InteractionMatrix, MatrixShape};
use crate::domain::rating::MergedRecord;

pub const FEATURE_NAMES: [&str; 7] = [
    "item_train_count",
    "item_mean_rating",
    "user_train_count",
    "user_mean_rating",
    "user_genre_affinity",
    "item_genre_count",
    "item_cf_similarity",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub negatives_per_positive: usize,
    pub seed:                   u64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { negatives_per_positive: 4, seed: 42 }
    }
}

/// One labelled candidate with its feature vector
/// (columns in `FEATURE_NAMES` order).
#[derive(Debug, Clone, PartialEq)]
pub struct RankerPair {
    pub u_index:  usize,
    pub m_index:  usize,
    pub label:    u8,
    pub features: Vec<f32>,
}

/// Users who co-rated any of one user's train items, with how
/// many items each shares. The user themself is left out.
struct Neighbourhood {
    weights: HashMap<usize, f32>,
    norm:    f32,
}

impl Neighbourhood {
    fn new(matrix: &InteractionMatrix, u_index: usize) -> Self {
        let mut weights: HashMap<usize, f32> = HashMap::new();
        let items = matrix.user_row(u_index).unwrap_or_default();

        for &m_index in &items.indices {
            let raters = matrix.item_row(m_index).unwrap_or_default();
            for &v in raters.indices.iter().filter(|&&v| v != u_index) {
                *weights.entry(v).or_insert(0.0) += 1.0;
            }
        }

        let norm = weights.values().map(|w| w * w).sum::<f32>().sqrt();
        Self { weights, norm }
    }

    /// Cosine between the item's binary rater vector and the
    /// neighbourhood weights; 0.0 when either side is empty.
    fn similarity(&self, matrix: &InteractionMatrix, m_index: usize) -> f32 {
        let raters = matrix.item_row(m_index).unwrap_or_default();
        if raters.nnz() == 0 || self.norm == 0.0 {
            return 0.0;
        }
        let dot: f32 = raters.indices.iter().filter_map(|v| self.weights.get(v)).sum();
        dot / ((raters.nnz() as f32).sqrt() * self.norm)
    }
}

/// Per-user and per-item aggregates over the train partition.
struct TrainProfile<'a> {
    item_count:  Vec<usize>,
    item_sum:    Vec<f64>,
    user_count:  Vec<usize>,
    user_sum:    Vec<f64>,
    user_genres: HashMap<usize, HashMap<&'a str, usize>>,
    item_genres: Vec<Vec<&'a str>>,
}

impl<'a> TrainProfile<'a> {
    fn new(merged: &'a [MergedRecord], train: &'a [MergedRecord], shape: MatrixShape) -> Self {
        let mut profile = TrainProfile {
            item_count:  vec![0; shape.n_items],
            item_sum:    vec![0.0; shape.n_items],
            user_count:  vec![0; shape.n_users],
            user_sum:    vec![0.0; shape.n_users],
            user_genres: HashMap::new(),
            item_genres: vec![Vec::new(); shape.n_items],
        };

        // Genres are catalog data, taken from the full merged table
        let mut seen = HashSet::new();
        for rec in merged {
            if seen.insert(rec.m_index) {
                profile.item_genres[rec.m_index] = rec.genre_tokens().collect();
            }
        }

        for rec in train {
            profile.item_count[rec.m_index] += 1;
            profile.item_sum[rec.m_index]   += rec.rating;
            profile.user_count[rec.u_index] += 1;
            profile.user_sum[rec.u_index]   += rec.rating;

            let genres = profile.user_genres.entry(rec.u_index).or_default();
            for g in rec.genre_tokens() {
                *genres.entry(g).or_insert(0) += 1;
            }
        }
        profile
    }

    fn features(&self, u_index: usize, m_index: usize, cf_similarity: f32) -> Vec<f32> {
        let mean = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };

        let item_genres = &self.item_genres[m_index];
        let user_total  = self.user_count[u_index];
        let affinity = match self.user_genres.get(&u_index) {
            Some(counts) if user_total > 0 && !item_genres.is_empty() => {
                let share: f64 = item_genres
                    .iter()
                    .map(|g| *counts.get(g).unwrap_or(&0) as f64 / user_total as f64)
                    .sum();
                share / item_genres.len() as f64
            }
            _ => 0.0,
        };

        vec![
            self.item_count[m_index] as f32,
            mean(self.item_sum[m_index], self.item_count[m_index]) as f32,
            user_total as f32,
            mean(self.user_sum[u_index], user_total) as f32,
            affinity as f32,
            item_genres.len() as f32,
            cf_similarity,
        ]
    }
}

/// Build the labelled candidate table.
///
/// `merged` supplies catalog genres and the set of items each user
/// has rated; `train` and the train `matrix` supply every feature
/// value; `test` supplies the positives. Users are emitted in
/// ascending `u_index` order, positives before negatives. Same
/// inputs and seed, same output.
pub fn build_ranker_pairs(
    merged: &[MergedRecord],
    train:  &[MergedRecord],
    test:   &[MergedRecord],
    matrix: &InteractionMatrix,
    cfg:    &FeatureConfig,
) -> Vec<RankerPair> {
    let shape   = matrix.shape();
    let profile = TrainProfile::new(merged, train, shape);
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let mut rated: HashMap<usize, HashSet<usize>> = HashMap::new();
    for rec in merged {
        rated.entry(rec.u_index).or_default().insert(rec.m_index);
    }

    // Distinct test items per user, first occurrence order
    let mut positives: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for rec in test {
        let items = positives.entry(rec.u_index).or_default();
        if !items.contains(&rec.m_index) {
            items.push(rec.m_index);
        }
    }

    let mut pairs = Vec::new();
    let empty = HashSet::new();

    for (u_index, items) in positives {
        let neighbours = Neighbourhood::new(matrix, u_index);
        let features = |m_index: usize| {
            profile.features(u_index, m_index, neighbours.similarity(matrix, m_index))
        };

        for &m_index in &items {
            pairs.push(RankerPair {
                u_index,
                m_index,
                label: 1,
                features: features(m_index),
            });
        }

        let seen = rated.get(&u_index).unwrap_or(&empty);
        let unrated: Vec<usize> = (0..shape.n_items).filter(|m| !seen.contains(m)).collect();
        let wanted = cfg.negatives_per_positive * items.len();

        for &m_index in unrated.choose_multiple(&mut rng, wanted) {
            pairs.push(RankerPair {
                u_index,
                m_index,
                label: 0,
                features: features(m_index),
            });
        }
    }

    let n_pos = pairs.iter().filter(|p| p.label == 1).count();
    tracing::info!(
        "Built {} ranker pairs ({} positive, {} negative)",
        pairs.len(),
        n_pos,
        pairs.len() - n_pos,
    );
    pairs
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn rec(u_index: usize, m_index: usize, rating: f64, genres: &str) -> MergedRecord {
        MergedRecord {
            user_id:   u_index as i64,
            movie_id:  m_index as i64,
            u_index,
            m_index,
            rating,
            timestamp: DateTime::from_timestamp(0, 0).unwrap(),
            title:     format!("Movie {m_index}"),
            genres:    genres.to_string(),
        }
    }

    fn train_matrix(merged: &[MergedRecord], train: &[MergedRecord]) -> InteractionMatrix {
        InteractionMatrix::build(train, MatrixShape::from_records(merged)).unwrap()
    }

    fn fixture() -> (Vec<MergedRecord>, Vec<MergedRecord>, Vec<MergedRecord>) {
        let train = vec![
            rec(0, 0, 4.0, "Action|Crime"),
            rec(0, 1, 2.0, "Drama"),
            rec(1, 0, 5.0, "Action|Crime"),
        ];
        let test = vec![rec(0, 2, 5.0, "Action"), rec(1, 1, 3.0, "Drama")];
        let mut merged = train.clone();
        merged.extend(test.clone());
        merged.push(rec(2, 3, 1.0, "Comedy"));
        merged.push(rec(2, 4, 1.0, "Comedy|Drama"));
        merged.push(rec(2, 5, 1.0, "Horror"));
        (merged, train, test)
    }

    #[test]
    fn test_positives_are_test_pairs() {
        let (merged, train, test) = fixture();
        let matrix = train_matrix(&merged, &train);
        let pairs = build_ranker_pairs(&merged, &train, &test, &matrix, &FeatureConfig::default());

        let positives: Vec<(usize, usize)> = pairs
            .iter()
            .filter(|p| p.label == 1)
            .map(|p| (p.u_index, p.m_index))
            .collect();
        assert_eq!(positives, vec![(0, 2), (1, 1)]);
    }

    #[test]
    fn test_negatives_are_unrated_items() {
        let (merged, train, test) = fixture();
        let matrix = train_matrix(&merged, &train);
        let pairs = build_ranker_pairs(&merged, &train, &test, &matrix, &FeatureConfig::default());

        for p in pairs.iter().filter(|p| p.label == 0) {
            assert!(
                !merged.iter().any(|r| r.u_index == p.u_index && r.m_index == p.m_index),
                "negative ({}, {}) was rated",
                p.u_index,
                p.m_index
            );
        }
        // User 0 rated 0, 1, 2 → only 3 of 6 items are left, fewer than 4 wanted
        assert_eq!(pairs.iter().filter(|p| p.u_index == 0 && p.label == 0).count(), 3);
    }

    #[test]
    fn test_features_use_train_only() {
        let (merged, train, test) = fixture();
        let matrix = train_matrix(&merged, &train);
        let pairs = build_ranker_pairs(&merged, &train, &test, &matrix, &FeatureConfig::default());

        let p = pairs.iter().find(|p| p.u_index == 0 && p.m_index == 2).unwrap();
        assert_eq!(p.features.len(), FEATURE_NAMES.len());
        // Item 2 only appears in test, so it has no train statistics
        assert_eq!(p.features[0], 0.0);
        assert_eq!(p.features[1], 0.0);
        // User 0: two train ratings, mean 3.0
        assert_eq!(p.features[2], 2.0);
        assert_eq!(p.features[3], 3.0);
        // One of user 0's two train ratings is Action
        assert!((p.features[4] - 0.5).abs() < 1e-6);
        assert_eq!(p.features[5], 1.0);
        // Nobody rated item 2 in train
        assert_eq!(p.features[6], 0.0);
    }

    #[test]
    fn test_cf_similarity_from_train_co_ratings() {
        let (merged, train, test) = fixture();
        let matrix = train_matrix(&merged, &train);
        let pairs = build_ranker_pairs(&merged, &train, &test, &matrix, &FeatureConfig::default());

        // User 1 trained on item 0, which user 0 also rated; user 0 is
        // the only train rater of item 1, so the cosine is exactly 1
        let p = pairs.iter().find(|p| p.u_index == 1 && p.m_index == 1).unwrap();
        assert!((p.features[6] - 1.0).abs() < 1e-6);

        // Item 2 has no train raters at all
        let p = pairs.iter().find(|p| p.u_index == 0 && p.m_index == 2).unwrap();
        assert_eq!(p.features[6], 0.0);

        // Test rows never reach the matrix, so they cannot feed the score
        assert!(matrix.item_row(2).unwrap().indices.is_empty());
    }

    #[test]
    fn test_same_seed_same_pairs() {
        let (merged, train, test) = fixture();
        let matrix = train_matrix(&merged, &train);
        let cfg = FeatureConfig { negatives_per_positive: 1, seed: 7 };

        let a = build_ranker_pairs(&merged, &train, &test, &matrix, &cfg);
        let b = build_ranker_pairs(&merged, &train, &test, &matrix, &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_negatives_when_disabled() {
        let (merged, train, test) = fixture();
        let matrix = train_matrix(&merged, &train);
        let cfg = FeatureConfig { negatives_per_positive: 0, seed: 1 };

        let pairs = build_ranker_pairs(&merged, &train, &test, &matrix, &cfg);
        assert!(pairs.iter().all(|p| p.label == 1));
    }
}
