// ============================================================
// Layer 2 — PipelineUseCase
// ============================================================
// Runs the offline preprocessing pipeline in a fixed order:
//
//   Step 1: Validate configuration
//   Step 2: Load ratings.dat + movies.dat     (Layer 4 - data)
//   Step 3: Merge, filter and index           (Layer 4 - data)
//   Step 4: Expand genres                     (Layer 4 - data)
//   Step 5: Time-based train/test split       (Layer 4 - data)
//   Step 6: Item × user train matrix          (Layer 4 - data)
//   Step 7: User and movie maps               (Layer 4 - data)
//   Step 8: Ranker candidate pairs            (Layer 4 - data)
//   Step 9: Persist artifacts, config, stats  (Layer 6 - infra)
//
// Any failure aborts the run. There is no resume: a rerun
// starts from the raw files and overwrites every artifact.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::data::{
    cleaner::{merge_and_clean, CleanConfig},
    features::{build_ranker_pairs, FeatureConfig, FEATURE_NAMES},
    genres::build_genre_table,
    loader::MovieLensLoader,
    matrix::{build_item_map, build_user_map, InteractionMatrix, MatrixShape},
    splitter::{time_based_split, SplitConfig},
};
use crate::domain::traits::RatingSource;
use crate::infra::{
    artifact_store::{
        ArtifactStore, CONFIG_FILE, GENRES_FILE, MATRIX_FILE, MERGED_FILE, MOVIE_MAP_FILE,
        RANKER_PAIRS_FILE, STATS_FILE, TEST_FILE, TRAIN_FILE, USER_MAP_FILE,
    },
    run_stats::RunStats,
};

// ─── Pipeline Configuration ──────────────────────────────────────────────────
// Everything that shapes one run. Saved next to the artifacts as
// pipeline_config.json so a processed directory records how it
// was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub raw_dir:  String,
    pub out_dir:  String,
    pub clean:    CleanConfig,
    pub split:    SplitConfig,
    pub features: FeatureConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir:  "data/raw".to_string(),
            out_dir:  "data/processed".to_string(),
            clean:    CleanConfig::default(),
            split:    SplitConfig::default(),
            features: FeatureConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.clean.validate()?;
        self.split.validate()?;
        Ok(())
    }
}

// ─── PipelineUseCase ──────────────────────────────────────────────────────────
pub struct PipelineUseCase {
    config: PipelineConfig,
}

impl PipelineUseCase {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Execute every stage and write the artifacts. Returns the
    /// counters that were also saved to run_stats.json.
    pub fn execute(&self) -> Result<RunStats> {
        let cfg   = &self.config;
        let timer = Instant::now();
        let mut stats = RunStats::new(Utc::now());

        // ── Step 1: Validate before touching the filesystem ──────────────────
        cfg.validate()?;

        // ── Step 2: Load raw tables ───────────────────────────────────────────
        tracing::info!("Loading raw MovieLens files from '{}'", cfg.raw_dir);
        let raw = MovieLensLoader::new(&cfg.raw_dir)
            .load()
            .with_context(|| format!("Failed to load raw data from '{}'", cfg.raw_dir))?;
        stats.raw_events   = raw.events.len();
        stats.catalog_rows = raw.items.len();

        // ── Step 3: Merge, filter, index ──────────────────────────────────────
        let merged = merge_and_clean(&raw, &cfg.clean)?;
        stats.record_clean(&merged.stats);
        stats.merged_rows = merged.records.len();
        stats.n_users     = merged.users.len();
        stats.n_items     = merged.items.len();
        // The raw tables are not needed past this point
        drop(raw);

        // ── Step 4: Genre table ───────────────────────────────────────────────
        let genres = build_genre_table(&merged.records);
        stats.genre_rows = genres.len();

        // ── Step 5: Time-based split ──────────────────────────────────────────
        let split = time_based_split(&merged.records, &cfg.split)?;
        stats.train_rows    = split.train.len();
        stats.test_rows     = split.test.len();
        stats.kept_users    = split.kept_users;
        stats.dropped_users = split.dropped_users;

        // ── Step 6: Train matrix with global dimensions ───────────────────────
        // Shape comes from the whole merged table so that users and
        // items absent from train still own a (empty) row/column.
        let shape  = MatrixShape::from_records(&merged.records);
        let matrix = InteractionMatrix::build(&split.train, shape)?;
        stats.matrix_rows = shape.n_items;
        stats.matrix_cols = shape.n_users;
        stats.matrix_nnz  = matrix.nnz();

        // ── Step 7: Id maps ───────────────────────────────────────────────────
        let user_map  = build_user_map(&merged.users);
        let movie_map = build_item_map(&merged.items, &merged.records);

        // ── Step 8: Ranker pairs ──────────────────────────────────────────────
        let pairs = build_ranker_pairs(
            &merged.records,
            &split.train,
            &split.test,
            &matrix,
            &cfg.features,
        );
        stats.ranker_pairs = pairs.len();

        // ── Step 9: Persist ───────────────────────────────────────────────────
        let store = ArtifactStore::create(&cfg.out_dir)?;
        store.write_table(MERGED_FILE, &merged.records)?;
        store.write_table(GENRES_FILE, &genres)?;
        store.write_table(TRAIN_FILE, &split.train)?;
        store.write_table(TEST_FILE, &split.test)?;
        store.write_table(USER_MAP_FILE, &user_map)?;
        store.write_table(MOVIE_MAP_FILE, &movie_map)?;
        store.write_matrix(MATRIX_FILE, matrix.item_user())?;
        store.write_ranker_pairs(RANKER_PAIRS_FILE, &FEATURE_NAMES, &pairs)?;
        store.write_json(CONFIG_FILE, cfg)?;

        stats.elapsed_ms = timer.elapsed().as_millis() as u64;
        store.write_json(STATS_FILE, &stats)?;

        tracing::info!("Artifacts written to '{}'", store.dir().display());
        stats.log();
        Ok(stats)
    }
}
