//! Error types for Focus Signal

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Errors reported by a category oracle for a single title.
///
/// These never abort a run: the label resolver retries transient failures and
/// falls back to `Category::Unclassified` once the policy is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Temporary failure (timeout, rate limit, unavailable backend)
    #[error("transient oracle failure: {0}")]
    Transient(String),

    /// The oracle cannot or will not label this title; retrying is pointless
    #[error("oracle rejected title: {0}")]
    Rejected(String),
}

impl OracleError {
    /// Whether the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, OracleError::Transient(_))
    }
}
