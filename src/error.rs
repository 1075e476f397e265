//! Errors raised at the application's I/O edge. The chart itself is
//! infallible.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GanttError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV is missing required columns. Found headers: {found:?}. Need columns for: title, start, end.")]
    MissingColumns { found: Vec<String> },

    #[error("No valid events found in CSV ({skipped} rows skipped)")]
    NoValidRows { skipped: usize },

    #[error("CSV file is empty or has no data rows")]
    EmptyCsv,
}

impl GanttError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GanttError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GanttError>;
