//! Error types for codemap-json operations.

use std::io;
use thiserror::Error;

/// The error type for codemap-json operations.
///
/// Decoding problems in documents that already exist on disk are not errors;
/// they surface as [`Warning`](crate::Warning)s through
/// [`read_json_resilient`](crate::read_json_resilient).
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading or writing.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for codemap-json operations.
pub type Result<T> = std::result::Result<T, Error>;
