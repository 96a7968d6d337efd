//! CLI error types.

use ds_search::SearchError;
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Search failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Returns the underlying server or transport diagnostic, if any.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Search(e) => e.diagnostic(),
            _ => None,
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
