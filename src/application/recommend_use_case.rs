// ============================================================
// Layer 2 — Recommend Use Case
// ============================================================
// Reads a processed directory back and answers three questions
// about one user (by dense u_index):
//
//   1. What did they rate most recently?      → user_history
//   2. What would a CF model suggest?         → recommend_cf
//   3. How does a ranker order their pairs?   → recommend_hybrid
//
// Models are supplied by the caller as trait objects; this
// layer only joins their output back to titles and genres.

use anyhow::{Context, Result};

use crate::data::features::RankerPair;
use crate::data::matrix::{InteractionMatrix, MatrixShape};
use crate::domain::error::PipelineError;
use crate::domain::id_index::IdIndex;
use crate::domain::rating::{ItemMapRow, MergedRecord, RawId, UserMapRow};
use crate::domain::traits::{Ranker, Recommender};
use crate::infra::artifact_store::{
    ArtifactStore, MATRIX_FILE, MERGED_FILE, MOVIE_MAP_FILE, RANKER_PAIRS_FILE, STATS_FILE,
    USER_MAP_FILE,
};
use crate::infra::run_stats::RunStats;

/// One collaborative-filtering suggestion, ranked from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct CfRecommendation {
    pub rank:     usize,
    pub movie_id: RawId,
    pub title:    String,
    pub genres:   String,
    pub score:    f32,
}

/// One scored ranker candidate, ranked from 1. `label` is 1 when the
/// pair is a held-out test rating.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridRecommendation {
    pub rank:     usize,
    pub movie_id: RawId,
    pub title:    String,
    pub genres:   String,
    pub label:    u8,
    pub score:    f32,
}

pub struct RecommendUseCase {
    merged:        Vec<MergedRecord>,
    movies:        Vec<ItemMapRow>,
    users:         IdIndex,
    matrix:        InteractionMatrix,
    feature_names: Vec<String>,
    pairs:         Vec<RankerPair>,
}

impl RecommendUseCase {
    /// Load every artifact the reader needs from `processed_dir`.
    pub fn open(processed_dir: &str) -> Result<Self> {
        let store = ArtifactStore::open(processed_dir)?;

        let merged: Vec<MergedRecord> = store.read_table(MERGED_FILE)?;
        let movies: Vec<ItemMapRow>   = store.read_table(MOVIE_MAP_FILE)?;
        let users:  Vec<UserMapRow>   = store.read_table(USER_MAP_FILE)?;
        let matrix = InteractionMatrix::from_matrix(store.read_matrix(MATRIX_FILE)?);
        let (feature_names, pairs) = store
            .read_ranker_pairs(RANKER_PAIRS_FILE)
            .context("Cannot load ranker candidate pairs")?;

        // The stats file is written last, so a mismatch here means the
        // directory mixes artifacts from different runs
        let stats: RunStats = store.read_json(STATS_FILE)?;
        if stats.matrix_nnz != matrix.nnz() || stats.ranker_pairs != pairs.len() {
            return Err(PipelineError::shape_mismatch(
                "stored matrix entries / ranker pairs (from run_stats.json)",
                format!("{} / {}", stats.matrix_nnz, stats.ranker_pairs),
                format!("{} / {}", matrix.nnz(), pairs.len()),
            )
            .into());
        }

        tracing::info!(
            "Loaded {} merged rows, {} movies, {} users, {} ranker pairs from '{}'",
            merged.len(),
            movies.len(),
            users.len(),
            pairs.len(),
            processed_dir
        );

        Self::from_parts(merged, movies, users, matrix, feature_names, pairs)
    }

    /// Assemble a reader from in-memory artifacts, checking that the
    /// matrix shape agrees with both id maps and that both maps are
    /// dense.
    pub fn from_parts(
        merged:        Vec<MergedRecord>,
        movies:        Vec<ItemMapRow>,
        mut users:     Vec<UserMapRow>,
        matrix:        InteractionMatrix,
        feature_names: Vec<String>,
        pairs:         Vec<RankerPair>,
    ) -> Result<Self> {
        let expected = MatrixShape { n_items: movies.len(), n_users: users.len() };
        if matrix.shape() != expected {
            return Err(PipelineError::shape_mismatch(
                "item-user matrix (items x users)",
                format!("{} x {}", expected.n_items, expected.n_users),
                format!("{} x {}", matrix.shape().n_items, matrix.shape().n_users),
            )
            .into());
        }
        if let Some((pos, row)) = movies.iter().enumerate().find(|(i, row)| row.m_index != *i) {
            return Err(PipelineError::shape_mismatch("movie map row", pos, row.m_index).into());
        }

        users.sort_by_key(|u| u.u_index);
        let index = IdIndex::from_raw_ids(users.iter().map(|u| u.user_id));
        if let Some(row) = users.iter().find(|u| index.dense(u.user_id) != Some(u.u_index)) {
            return Err(PipelineError::shape_mismatch(
                format!("user map entry for user {}", row.user_id),
                format!("{:?}", index.dense(row.user_id)),
                row.u_index,
            )
            .into());
        }

        Ok(Self {
            merged,
            movies,
            users: index,
            matrix,
            feature_names,
            pairs,
        })
    }

    /// The train item × user matrix, for fitting models on the fly.
    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    /// Raw user id for a dense index, if the user is known.
    pub fn user_id(&self, u_index: usize) -> Option<RawId> {
        self.users.raw(u_index)
    }

    /// Dense index for a raw user id, if the user is known.
    pub fn u_index(&self, user_id: RawId) -> Option<usize> {
        self.users.dense(user_id)
    }

    /// Column names of the ranker feature rows, in order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// The user's merged ratings, most recent first, at most `max_items`.
    pub fn user_history(&self, u_index: usize, max_items: usize) -> Vec<MergedRecord> {
        let mut rows: Vec<MergedRecord> = self
            .merged
            .iter()
            .filter(|r| r.u_index == u_index)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(max_items);
        rows
    }

    /// Ask `model` for the user's top items and join titles/genres.
    /// A user outside the model's range gets an empty list.
    pub fn recommend_cf(
        &self,
        u_index: usize,
        model:   &dyn Recommender,
        top_n:   usize,
    ) -> Result<Vec<CfRecommendation>> {
        if u_index >= model.num_users() {
            tracing::warn!(
                "User index {} is outside the model's {} users",
                u_index,
                model.num_users()
            );
            return Ok(Vec::new());
        }

        let user_row = self.matrix.user_row(u_index).unwrap_or_default();
        let scored = model.recommend(u_index, &user_row, top_n)?;

        scored
            .into_iter()
            .enumerate()
            .map(|(i, item)| -> Result<CfRecommendation> {
                let movie = self.movie(item.m_index)?;
                Ok(CfRecommendation {
                    rank:     i + 1,
                    movie_id: movie.movie_id,
                    title:    movie.title.clone(),
                    genres:   movie.genres.clone(),
                    score:    item.score,
                })
            })
            .collect()
    }

    /// Score the user's ranker candidates and return the best `top_n`.
    pub fn recommend_hybrid(
        &self,
        u_index: usize,
        ranker:  &dyn Ranker,
        top_n:   usize,
    ) -> Result<Vec<HybridRecommendation>> {
        let candidates: Vec<&RankerPair> =
            self.pairs.iter().filter(|p| p.u_index == u_index).collect();
        if candidates.is_empty() {
            tracing::info!("User index {} has no ranker candidates", u_index);
            return Ok(Vec::new());
        }

        let rows: Vec<Vec<f32>> = candidates.iter().map(|p| p.features.clone()).collect();
        let scores = ranker.predict(&rows)?;
        if scores.len() != candidates.len() {
            return Err(PipelineError::shape_mismatch(
                "ranker scores",
                candidates.len(),
                scores.len(),
            )
            .into());
        }

        let mut scored: Vec<(&RankerPair, f32)> = candidates.into_iter().zip(scores).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.m_index.cmp(&b.0.m_index)));
        scored.truncate(top_n);

        scored
            .into_iter()
            .enumerate()
            .map(|(i, (pair, score))| -> Result<HybridRecommendation> {
                let movie = self.movie(pair.m_index)?;
                Ok(HybridRecommendation {
                    rank:     i + 1,
                    movie_id: movie.movie_id,
                    title:    movie.title.clone(),
                    genres:   movie.genres.clone(),
                    label:    pair.label,
                    score,
                })
            })
            .collect()
    }

    fn movie(&self, m_index: usize) -> Result<&ItemMapRow> {
        self.movies.get(m_index).ok_or_else(|| {
            PipelineError::shape_mismatch(
                "item index from model",
                format!("< {}", self.movies.len()),
                m_index,
            )
            .into()
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline_use_case::{tests::write_raw_fixture, PipelineConfig, PipelineUseCase};
    use crate::data::matrix::{build_item_map, build_user_map};
    use crate::domain::traits::{ScoredItem, SparseRow};
    use crate::ml::linear_ranker::LinearRanker;
    use crate::ml::popularity::PopularityRecommender;
    use chrono::DateTime;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn rec(u_index: usize, m_index: usize, ts: i64) -> MergedRecord {
        MergedRecord {
            user_id:   u_index as i64 + 1,
            movie_id:  m_index as i64 * 10,
            u_index,
            m_index,
            rating:    4.0,
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            title:     format!("Movie {m_index}"),
            genres:    "Drama".to_string(),
        }
    }

    /// Id maps built the way the pipeline builds them.
    fn maps(merged: &[MergedRecord]) -> (Vec<ItemMapRow>, Vec<UserMapRow>) {
        let users = IdIndex::from_raw_ids(merged.iter().map(|r| r.user_id));
        let items = IdIndex::from_raw_ids(merged.iter().map(|r| r.movie_id));
        (build_item_map(&items, merged), build_user_map(&users))
    }

    fn reader() -> RecommendUseCase {
        let merged = vec![rec(0, 0, 5), rec(0, 1, 9), rec(0, 2, 1), rec(1, 0, 3), rec(1, 3, 4)];
        let train = vec![rec(0, 0, 5), rec(0, 2, 1), rec(1, 0, 3)];
        let shape = MatrixShape::from_records(&merged);
        let matrix = InteractionMatrix::build(&train, shape).unwrap();
        let pairs = vec![
            RankerPair { u_index: 0, m_index: 1, label: 1, features: vec![1.0, 0.0] },
            RankerPair { u_index: 0, m_index: 3, label: 0, features: vec![3.0, 0.0] },
            RankerPair { u_index: 1, m_index: 3, label: 1, features: vec![0.0, 2.0] },
        ];
        let (movies, users) = maps(&merged);
        let names = vec!["a".to_string(), "b".to_string()];
        RecommendUseCase::from_parts(merged, movies, users, matrix, names, pairs).unwrap()
    }

    /// Returns fixed items and records the row it was given.
    struct StubRecommender {
        seen_row: RefCell<Option<SparseRow>>,
    }

    impl Recommender for StubRecommender {
        fn num_users(&self) -> usize {
            2
        }

        fn recommend(&self, _u: usize, row: &SparseRow, top_n: usize) -> Result<Vec<ScoredItem>> {
            *self.seen_row.borrow_mut() = Some(row.clone());
            let mut items = vec![
                ScoredItem { m_index: 3, score: 0.9 },
                ScoredItem { m_index: 1, score: 0.4 },
            ];
            items.truncate(top_n);
            Ok(items)
        }
    }

    struct FirstFeatureRanker;

    impl Ranker for FirstFeatureRanker {
        fn predict(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
            Ok(rows.iter().map(|r| r[0]).collect())
        }
    }

    #[test]
    fn test_history_most_recent_first() {
        let reader = reader();
        let history = reader.user_history(0, 2);
        let items: Vec<usize> = history.iter().map(|r| r.m_index).collect();
        assert_eq!(items, vec![1, 0]);
        assert!(reader.user_history(7, 15).is_empty());
    }

    #[test]
    fn test_cf_passes_train_row_and_joins_titles() -> Result<()> {
        let reader = reader();
        let model = StubRecommender { seen_row: RefCell::new(None) };

        let recs = reader.recommend_cf(0, &model, 10)?;
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].rank, 1);
        assert_eq!(recs[0].title, "Movie 3");
        assert_eq!(recs[1].movie_id, 10);

        // Only train interactions are in the user's row
        let row = model.seen_row.borrow().clone().unwrap();
        assert_eq!(row.indices, vec![0, 2]);
        Ok(())
    }

    #[test]
    fn test_cf_unknown_user_is_empty() -> Result<()> {
        let reader = reader();
        let model = StubRecommender { seen_row: RefCell::new(None) };
        assert!(reader.recommend_cf(5, &model, 10)?.is_empty());
        assert!(model.seen_row.borrow().is_none());
        Ok(())
    }

    #[test]
    fn test_hybrid_sorts_by_score() -> Result<()> {
        let reader = reader();
        let recs = reader.recommend_hybrid(0, &FirstFeatureRanker, 10)?;

        let order: Vec<(RawId, u8)> = recs.iter().map(|r| (r.movie_id, r.label)).collect();
        assert_eq!(order, vec![(30, 0), (10, 1)]);
        assert_eq!(recs[0].score, 3.0);

        assert_eq!(reader.recommend_hybrid(0, &FirstFeatureRanker, 1)?.len(), 1);
        assert!(reader.recommend_hybrid(9, &FirstFeatureRanker, 10)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_hybrid_propagates_ranker_shape_error() {
        let reader = reader();
        let ranker = LinearRanker::uniform(6);
        let err = reader.recommend_hybrid(0, &ranker, 10).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_shape_disagreement_is_rejected() {
        let merged = vec![rec(0, 0, 1), rec(1, 1, 2)];
        let matrix = InteractionMatrix::build(&merged, MatrixShape { n_items: 2, n_users: 5 }).unwrap();

        let (movies, users) = maps(&merged);
        let result = RecommendUseCase::from_parts(merged, movies, users, matrix, Vec::new(), Vec::new());
        let err = result.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_user_ids_resolve_both_ways() {
        let reader = reader();
        assert_eq!(reader.num_users(), 2);
        assert_eq!(reader.user_id(1), Some(2));
        assert_eq!(reader.u_index(2), Some(1));
        assert_eq!(reader.user_id(5), None);
        assert_eq!(reader.u_index(99), None);
        assert_eq!(reader.feature_names(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_gap_in_user_map_is_rejected() {
        let merged = vec![rec(0, 0, 1), rec(1, 1, 2)];
        let matrix = InteractionMatrix::build(&merged, MatrixShape::from_records(&merged)).unwrap();
        let (movies, _) = maps(&merged);
        let users = vec![
            UserMapRow { user_id: 1, u_index: 0 },
            UserMapRow { user_id: 2, u_index: 2 },
        ];

        let result = RecommendUseCase::from_parts(merged, movies, users, matrix, Vec::new(), Vec::new());
        let err = result.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_stats_from_another_run_are_rejected() -> Result<()> {
        let raw = TempDir::new()?;
        let out = TempDir::new()?;
        write_raw_fixture(raw.path());
        PipelineUseCase::new(PipelineConfig {
            raw_dir: raw.path().display().to_string(),
            out_dir: out.path().display().to_string(),
            ..PipelineConfig::default()
        })
        .execute()?;

        let store = ArtifactStore::open(out.path())?;
        let mut stats: RunStats = store.read_json(STATS_FILE)?;
        stats.matrix_nnz += 1;
        store.write_json(STATS_FILE, &stats)?;

        let processed = out.path().display().to_string();
        let err = RecommendUseCase::open(&processed).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_reads_pipeline_output() -> Result<()> {
        let raw = TempDir::new()?;
        let out = TempDir::new()?;
        write_raw_fixture(raw.path());
        PipelineUseCase::new(PipelineConfig {
            raw_dir: raw.path().display().to_string(),
            out_dir: out.path().display().to_string(),
            ..PipelineConfig::default()
        })
        .execute()?;

        let processed = out.path().display().to_string();
        let reader = RecommendUseCase::open(&processed)?;
        assert_eq!(reader.num_users(), 3);
        assert_eq!(reader.user_id(2), Some(3));
        assert_eq!(reader.feature_names().len(), 7);

        // User 3 (u_index 2) has no train rows, so popularity covers the catalog
        let model = PopularityRecommender::fit(reader.matrix());
        assert_eq!(reader.recommend_cf(2, &model, 10)?.len(), 6);

        // User 2 (u_index 1) trained on four items, two remain
        let recs = reader.recommend_cf(1, &model, 10)?;
        assert_eq!(recs.len(), 2);

        let ranker = LinearRanker::uniform(reader.feature_names().len());
        let ranked = reader.recommend_hybrid(1, &ranker, 10)?;
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked.iter().filter(|r| r.label == 1).count(), 1);
        Ok(())
    }
}
