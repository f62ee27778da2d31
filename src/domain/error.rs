use std::path::PathBuf;

use thiserror::Error;

/// Faults raised by the pipeline stages and the artifact reader.
///
/// Filtering that removes rows (out-of-range ratings, sparse users)
/// is policy, not a fault, and never produces one of these.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{}:{line}: expected {expected} fields separated by '{separator}', found {found}", .path.display())]
    InputFormat {
        path:      PathBuf,
        line:      usize,
        separator: String,
        expected:  usize,
        found:     usize,
    },

    #[error("{}:{line}: cannot parse {column} from '{value}'", .path.display())]
    InvalidField {
        path:   PathBuf,
        line:   usize,
        column: &'static str,
        value:  String,
    },

    #[error("Timestamp {0} is outside the representable date range")]
    TimestampOutOfRange(i64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Shape mismatch: {context} expects {expected}, found {found}")]
    ShapeMismatch {
        context:  String,
        expected: String,
        found:    String,
    },
}

impl PipelineError {
    pub fn shape_mismatch(
        context:  impl Into<String>,
        expected: impl ToString,
        found:    impl ToString,
    ) -> Self {
        PipelineError::ShapeMismatch {
            context:  context.into(),
            expected: expected.to_string(),
            found:    found.to_string(),
        }
    }
}
