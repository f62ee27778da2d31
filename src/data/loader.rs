// ============================================================
// Layer 4 — MovieLens Loader
// ============================================================
// Reads the two raw MovieLens files from a directory:
//
//   ratings.dat   UserID::MovieID::Rating::Timestamp
//   movies.dat    MovieID::Title::Genres
//
// There is no header row; columns are positional and the
// separator is the literal two-character string "::".
//
// A row with the wrong number of fields, or a numeric field
// that does not parse, aborts the load. Range checks and the
// join against the catalog happen later in the cleaner.
//
// MovieLens 1M ships movies.dat in Latin-1, so a file that is
// not valid UTF-8 is decoded byte-for-char as Latin-1.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::domain::error::PipelineError;
use crate::domain::rating::{Event, ItemMetadata, RawTables};
use crate::domain::traits::RatingSource;

pub const RATINGS_FILE: &str = "ratings.dat";
pub const MOVIES_FILE:  &str = "movies.dat";
pub const SEPARATOR:    &str = "::";

const RATING_COLUMNS: usize = 4;
const MOVIE_COLUMNS:  usize = 3;

/// Loads `ratings.dat` and `movies.dat` from one directory.
/// Implements the RatingSource trait from Layer 3.
pub struct MovieLensLoader {
    dir: PathBuf,
}

impl MovieLensLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RatingSource for MovieLensLoader {
    fn load(&self) -> Result<RawTables> {
        let events = load_ratings(&self.dir.join(RATINGS_FILE))?;
        let items  = load_movies(&self.dir.join(MOVIES_FILE))?;

        tracing::info!(
            "Loaded {} rating events and {} catalog rows from '{}'",
            events.len(),
            items.len(),
            self.dir.display()
        );
        Ok(RawTables { events, items })
    }
}

/// Parse a ratings file into events.
pub fn load_ratings(path: &Path) -> Result<Vec<Event>> {
    let text = read_text(path)?;
    let mut events = Vec::new();

    for (line_no, line) in data_lines(&text) {
        let fields = split_fields(line, RATING_COLUMNS, path, line_no)?;
        events.push(Event::new(
            parse_field(fields[0], "user_id", path, line_no)?,
            parse_field(fields[1], "movie_id", path, line_no)?,
            parse_field(fields[2], "rating", path, line_no)?,
            parse_field(fields[3], "timestamp", path, line_no)?,
        ));
    }

    tracing::debug!("Parsed {} rows from '{}'", events.len(), path.display());
    Ok(events)
}

/// Parse a movies file into catalog rows.
pub fn load_movies(path: &Path) -> Result<Vec<ItemMetadata>> {
    let text = read_text(path)?;
    let mut items = Vec::new();

    for (line_no, line) in data_lines(&text) {
        let fields = split_fields(line, MOVIE_COLUMNS, path, line_no)?;
        items.push(ItemMetadata::new(
            parse_field::<i64>(fields[0], "movie_id", path, line_no)?,
            fields[1],
            fields[2],
        ));
    }

    tracing::debug!("Parsed {} rows from '{}'", items.len(), path.display());
    Ok(items)
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            tracing::debug!("'{}' is not UTF-8, decoding as Latin-1", path.display());
            Ok(err.into_bytes().iter().map(|&b| b as char).collect())
        }
    }
}

/// Non-blank lines with their 1-based line numbers, `\r` stripped.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn split_fields<'a>(
    line:     &'a str,
    expected: usize,
    path:     &Path,
    line_no:  usize,
) -> Result<Vec<&'a str>, PipelineError> {
    let fields: Vec<&str> = line.split(SEPARATOR).collect();
    if fields.len() != expected {
        return Err(PipelineError::InputFormat {
            path:      path.to_path_buf(),
            line:      line_no,
            separator: SEPARATOR.to_string(),
            expected,
            found:     fields.len(),
        });
    }
    Ok(fields)
}

fn parse_field<T: FromStr>(
    value:   &str,
    column:  &'static str,
    path:    &Path,
    line_no: usize,
) -> Result<T, PipelineError> {
    value.trim().parse().map_err(|_| PipelineError::InvalidField {
        path:   path.to_path_buf(),
        line:   line_no,
        column,
        value:  value.to_string(),
    })
}
