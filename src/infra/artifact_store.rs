// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Saves and restores every pipeline artifact in one directory.
//
// File layout:
//   data/processed/
//     merged.csv                ← cleaned, indexed events
//     movie_genres.csv          ← one row per (m_index, genre)
//     train.csv / test.csv      ← time-based partitions
//     user_map.csv              ← user_id <-> u_index
//     movie_map.csv             ← movie_id <-> m_index + title
//     item_user_train.mtx       ← item × user matrix (Matrix Market)
//     hybrid_train_pairs.csv    ← ranker candidates + features
//     pipeline_config.json      ← effective configuration
//     run_stats.json            ← counters for the run
//
// Every file is overwritten wholesale. Files are written one
// after another, so an aborted run can leave a mix of new and
// stale artifacts behind.

use anyhow::{anyhow, bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use sprs::CsMat;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::features::RankerPair;

pub const MERGED_FILE:       &str = "merged.csv";
pub const GENRES_FILE:       &str = "movie_genres.csv";
pub const TRAIN_FILE:        &str = "train.csv";
pub const TEST_FILE:         &str = "test.csv";
pub const USER_MAP_FILE:     &str = "user_map.csv";
pub const MOVIE_MAP_FILE:    &str = "movie_map.csv";
pub const MATRIX_FILE:       &str = "item_user_train.mtx";
pub const RANKER_PAIRS_FILE: &str = "hybrid_train_pairs.csv";
pub const CONFIG_FILE:       &str = "pipeline_config.json";
pub const STATS_FILE:        &str = "run_stats.json";

/// Fixed leading columns of the ranker pairs table.
const PAIR_KEY_COLUMNS: [&str; 3] = ["u_index", "m_index", "label"];

/// Reads and writes artifacts under one directory.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open a store for writing, creating the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing store for reading.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!(
                "Processed directory '{}' does not exist. Have you run 'run' first?",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    // ─── CSV tables ───────────────────────────────────────────────────────────

    /// Write `rows` as a CSV table with a header taken from the field names.
    pub fn write_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<()> {
        let path = self.path(name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;

        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("Cannot write row to '{}'", path.display()))?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} rows to '{}'", rows.len(), path.display());
        Ok(())
    }

    pub fn read_table<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.path(name);
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;

        let rows = reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .with_context(|| format!("Failed to parse '{}'", path.display()))?;
        Ok(rows)
    }

    // ─── Sparse matrix ────────────────────────────────────────────────────────

    pub fn write_matrix(&self, name: &str, matrix: &CsMat<f32>) -> Result<()> {
        let path = self.path(name);
        sprs::io::write_matrix_market(&path, matrix)
            .with_context(|| format!("Cannot write matrix to '{}'", path.display()))?;

        tracing::debug!(
            "Wrote {} x {} matrix ({} entries) to '{}'",
            matrix.rows(),
            matrix.cols(),
            matrix.nnz(),
            path.display()
        );
        Ok(())
    }

    pub fn read_matrix(&self, name: &str) -> Result<CsMat<f32>> {
        let path = self.path(name);
        let triplets = sprs::io::read_matrix_market::<f32, usize, _>(&path)
            .map_err(|e| anyhow!("Cannot read matrix '{}': {}", path.display(), e))?;
        Ok(triplets.to_csr())
    }

    // ─── JSON documents ───────────────────────────────────────────────────────

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    // ─── Ranker pairs ─────────────────────────────────────────────────────────
    // The feature columns are only known at runtime, so this table
    // is written record by record instead of through serde.

    pub fn write_ranker_pairs(
        &self,
        name:          &str,
        feature_names: &[&str],
        pairs:         &[RankerPair],
    ) -> Result<()> {
        let path = self.path(name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;

        writer.write_record(PAIR_KEY_COLUMNS.iter().chain(feature_names.iter()))?;
        for pair in pairs {
            let mut record = vec![
                pair.u_index.to_string(),
                pair.m_index.to_string(),
                pair.label.to_string(),
            ];
            record.extend(pair.features.iter().map(|f| f.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} ranker pairs to '{}'", pairs.len(), path.display());
        Ok(())
    }

    /// Read the ranker pairs table back, returning the feature column
    /// names alongside the rows.
    pub fn read_ranker_pairs(&self, name: &str) -> Result<(Vec<String>, Vec<RankerPair>)> {
        let path = self.path(name);
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;

        let headers = reader.headers()?.clone();
        if headers.len() < PAIR_KEY_COLUMNS.len()
            || headers.iter().zip(PAIR_KEY_COLUMNS).any(|(h, k)| h != k)
        {
            bail!("'{}' does not start with columns {:?}", path.display(), PAIR_KEY_COLUMNS);
        }
        let feature_names: Vec<String> = headers
            .iter()
            .skip(PAIR_KEY_COLUMNS.len())
            .map(str::to_string)
            .collect();

        let mut pairs = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to read record {} of '{}'", i + 1, path.display()))?;
            let field = |idx: usize| record.get(idx).unwrap_or_default();
            let ctx = || format!("Bad value in record {} of '{}'", i + 1, path.display());

            pairs.push(RankerPair {
                u_index:  field(0).parse().with_context(ctx)?,
                m_index:  field(1).parse().with_context(ctx)?,
                label:    field(2).parse().with_context(ctx)?,
                features: (PAIR_KEY_COLUMNS.len()..record.len())
                    .map(|idx| field(idx).parse::<f32>())
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(ctx)?,
            });
        }
        Ok((feature_names, pairs))
    }
}
