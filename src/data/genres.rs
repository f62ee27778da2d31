// ============================================================
// Layer 4 — Genre Expander
// ============================================================
// MovieLens stores genres as one pipe-delimited string per
// movie ("Action|Crime|Thriller"). Content features want one
// row per (item, genre), so this explodes the string.
//
// Input is the merged table, which repeats each movie once per
// rating; only the first (m_index, genres) pair of each movie
// is expanded.

use std::collections::HashSet;

use crate::domain::rating::{GenreRow, MergedRecord};

/// One `GenreRow` per genre token of every distinct (m_index, genres) pair.
pub fn build_genre_table(records: &[MergedRecord]) -> Vec<GenreRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for rec in records {
        if !seen.insert((rec.m_index, rec.genres.as_str())) {
            continue;
        }
        rows.extend(rec.genre_tokens().map(|genre| GenreRow {
            m_index: rec.m_index,
            genre:   genre.to_string(),
        }));
    }

    tracing::info!("Built genre table: {} rows for {} items", rows.len(), seen.len());
    rows
}
