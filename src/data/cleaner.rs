// ============================================================
// Layer 4 — Merger / Cleaner
// ============================================================
// Turns the two raw tables into the merged, indexed table that
// every later stage reads.
//
// Steps (applied in order, per event):
//   1. Left join the event to its catalog row by movie id
//   2. Missing genres: fill with "(no genres listed)" when the
//      policy is FillSentinel, otherwise leave missing
//   3. Drop rows whose title or genres are still missing
//      (this also drops events with no catalog row)
//   4. Keep ratings inside [rating_min, rating_max]
//   5. Epoch seconds -> UTC timestamp
// Then, over the surviving rows only:
//   6. Dense u_index / m_index in first-occurrence order
//
// Indices are assigned after filtering, so they are always
// contiguous over the rows that made it through.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::error::PipelineError;
use crate::domain::id_index::IdIndex;
use crate::domain::rating::{ItemMetadata, MergedRecord, RawId, RawTables, NO_GENRES_LISTED};

/// What to do with a catalog row whose genre field is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenrePolicy {
    /// Drop the row (the missing-field filter removes it).
    #[default]
    DropMissing,
    /// Substitute `"(no genres listed)"` before the missing-field filter,
    /// so only a missing title drops the row.
    FillSentinel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanConfig {
    pub rating_min:   f64,
    pub rating_max:   f64,
    pub genre_policy: GenrePolicy,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            rating_min:   0.5,
            rating_max:   5.0,
            genre_policy: GenrePolicy::DropMissing,
        }
    }
}

impl CleanConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.rating_min.is_finite() || !self.rating_max.is_finite() {
            return Err(PipelineError::InvalidConfig(
                "rating bounds must be finite".to_string(),
            ));
        }
        if self.rating_min > self.rating_max {
            return Err(PipelineError::InvalidConfig(format!(
                "rating_min {} is greater than rating_max {}",
                self.rating_min, self.rating_max
            )));
        }
        Ok(())
    }
}

/// Row counts removed by each filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanStats {
    pub unmatched_events:    usize,
    pub missing_fields:      usize,
    pub rating_out_of_range: usize,
}

/// The cleaned table together with the id mappings built over it.
#[derive(Debug, Clone, Default)]
pub struct Merged {
    pub records: Vec<MergedRecord>,
    pub users:   IdIndex,
    pub items:   IdIndex,
    pub stats:   CleanStats,
}

/// Join, filter and index the raw tables.
pub fn merge_and_clean(raw: &RawTables, cfg: &CleanConfig) -> Result<Merged, PipelineError> {
    cfg.validate()?;

    let catalog = build_catalog(&raw.items);
    let mut stats = CleanStats::default();

    // Steps 1-5: filtered rows, still without dense indices
    let mut kept: Vec<(RawId, RawId, f64, DateTime<Utc>, String, String)> =
        Vec::with_capacity(raw.events.len());

    for event in &raw.events {
        let Some(item) = catalog.get(&event.movie_id) else {
            stats.unmatched_events += 1;
            continue;
        };

        let genres = match (&item.genres, cfg.genre_policy) {
            (Some(g), _) => Some(g.clone()),
            (None, GenrePolicy::FillSentinel) => Some(NO_GENRES_LISTED.to_string()),
            (None, GenrePolicy::DropMissing) => None,
        };
        let (Some(title), Some(genres)) = (item.title.clone(), genres) else {
            stats.missing_fields += 1;
            continue;
        };

        // NaN fails both comparisons and is dropped here too
        if !(event.rating >= cfg.rating_min && event.rating <= cfg.rating_max) {
            stats.rating_out_of_range += 1;
            continue;
        }

        let timestamp = DateTime::from_timestamp(event.timestamp, 0)
            .ok_or(PipelineError::TimestampOutOfRange(event.timestamp))?;

        kept.push((event.user_id, event.movie_id, event.rating, timestamp, title, genres));
    }

    // Step 6: dense indices over the final rows only
    let mut users = IdIndex::new();
    let mut items = IdIndex::new();
    let records: Vec<MergedRecord> = kept
        .into_iter()
        .map(|(user_id, movie_id, rating, timestamp, title, genres)| MergedRecord {
            user_id,
            movie_id,
            u_index: users.insert(user_id),
            m_index: items.insert(movie_id),
            rating,
            timestamp,
            title,
            genres,
        })
        .collect();

    tracing::info!(
        "Merged {} of {} events ({} users, {} items); dropped {} unmatched, {} incomplete, {} out of range",
        records.len(),
        raw.events.len(),
        users.len(),
        items.len(),
        stats.unmatched_events,
        stats.missing_fields,
        stats.rating_out_of_range,
    );
    if users.is_empty() {
        tracing::warn!("No events survived cleaning; downstream artifacts will be empty");
    }

    Ok(Merged { records, users, items, stats })
}

/// Catalog keyed by movie id. The first row for a repeated id wins.
fn build_catalog(items: &[ItemMetadata]) -> HashMap<RawId, &ItemMetadata> {
    let mut catalog = HashMap::with_capacity(items.len());
    let mut duplicates = 0usize;

    for item in items {
        if catalog.contains_key(&item.movie_id) {
            duplicates += 1;
        } else {
            catalog.insert(item.movie_id, item);
        }
    }

    if duplicates > 0 {
        tracing::warn!("Catalog repeats {} movie ids; keeping the first row of each", duplicates);
    }
    catalog
}
