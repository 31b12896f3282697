//! Error types for the ETL pass.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for ETL operations.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The store could not be reached or refused the credentials.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed inside the store (including constraint violations).
    #[error("Execution error: {0}")]
    Execution(String),

    /// An input record did not have the expected shape.
    #[error("Data error in {}{}: {message}", path.display(), fmt_line(*line))]
    DataShape {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error.
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

fn fmt_line(line: Option<usize>) -> String {
    line.map(|l| format!(" line {}", l)).unwrap_or_default()
}

impl EtlError {
    /// Create a data-shape error for a whole file.
    pub fn data(path: &Path, message: impl Into<String>) -> Self {
        Self::DataShape {
            path: path.to_path_buf(),
            line: None,
            message: message.into(),
        }
    }

    /// Create a data-shape error pointing at a 1-based line.
    pub fn data_at(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::DataShape {
            path: path.to_path_buf(),
            line: Some(line),
            message: message.into(),
        }
    }

    /// True for errors caused by the input files rather than the store.
    pub fn is_data_shape(&self) -> bool {
        matches!(self, Self::DataShape { .. })
    }
}

/// Result type alias for ETL operations.
pub type EtlResult<T> = Result<T, EtlError>;
