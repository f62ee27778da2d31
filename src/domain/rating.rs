// ============================================================
// Layer 3 — Rating Domain Types
// ============================================================
// The tables that flow through the pipeline, leaves first:
//
//   Event + ItemMetadata      (raw, as parsed from disk)
//          │
//          ▼
//   MergedRecord              (joined, cleaned, dense indices)
//          │
//          ├── GenreRow       (one row per item/genre token)
//          ├── UserMapRow     (raw user id <-> u_index)
//          └── ItemMapRow     (raw movie id <-> m_index + catalog)
//
// Field names double as CSV column names, so the persisted
// artifacts keep the same headers as the in-memory tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw identifier as it appears in the input logs.
pub type RawId = i64;

/// Sentinel genre string used when a missing genre field is filled in.
pub const NO_GENRES_LISTED: &str = "(no genres listed)";

/// A single rating action as read from the events file.
/// Duplicate (user, movie) pairs are kept as separate events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id:  RawId,
    pub movie_id: RawId,
    pub rating:   f64,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
}

impl Event {
    pub fn new(user_id: RawId, movie_id: RawId, rating: f64, timestamp: i64) -> Self {
        Self { user_id, movie_id, rating, timestamp }
    }
}

/// One catalog row. An empty title or genre field is stored as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub movie_id: RawId,
    pub title:    Option<String>,
    pub genres:   Option<String>,
}

impl ItemMetadata {
    pub fn new(
        movie_id: RawId,
        title:    impl Into<String>,
        genres:   impl Into<String>,
    ) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            movie_id,
            title:  non_empty(title.into()),
            genres: non_empty(genres.into()),
        }
    }
}

/// Both raw tables produced by a `RatingSource`.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub events: Vec<Event>,
    pub items:  Vec<ItemMetadata>,
}

/// An event joined with its catalog row, cleaned, and tagged with
/// dense user/item indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub user_id:   RawId,
    pub movie_id:  RawId,
    pub u_index:   usize,
    pub m_index:   usize,
    pub rating:    f64,
    pub timestamp: DateTime<Utc>,
    pub title:     String,
    pub genres:    String,
}

impl MergedRecord {
    /// Individual genre tokens of the pipe-delimited genre string.
    pub fn genre_tokens(&self) -> impl Iterator<Item = &str> {
        self.genres.split('|')
    }
}

/// One (item, genre) pair of the exploded genre table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRow {
    pub m_index: usize,
    pub genre:   String,
}

/// Raw user id <-> dense user index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMapRow {
    pub user_id: RawId,
    pub u_index: usize,
}

/// Raw movie id <-> dense item index, with the catalog fields
/// needed to display a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMapRow {
    pub movie_id: RawId,
    pub m_index:  usize,
    pub title:    String,
    pub genres:   String,
}
