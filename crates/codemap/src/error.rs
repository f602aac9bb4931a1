//! Error types for codemap operations.
//!
//! Errors are categorized into two main types:
//!
//! - **`Error`**: Top-level errors that halt an operation (I/O failures while
//!   saving, a missing index, invalid paths)
//! - **`IndexError`**: File-level errors that are collected but don't halt an
//!   indexing run
//!
//! Corrupted index documents are neither: they load as empty structures and are
//! reported through [`LoadWarning`](crate::LoadWarning).
//!
//! `IndexErrorKind` uses a 4xx/5xx style categorization:
//! - Input problems (user's fault): parse errors, unsupported languages
//! - Internal problems (our fault): I/O errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type for codemap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for codemap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No index exists for the requested root
    #[error("no index found at {}", path.display())]
    NotFound {
        /// The manifest path that was looked up.
        path: PathBuf,
    },

    /// A relative path could not be mapped into the index
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path as given.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<codemap_json::Error> for Error {
    fn from(err: codemap_json::Error) -> Self {
        match err {
            codemap_json::Error::Io(e) => Self::Io(e),
            codemap_json::Error::Json(e) => Self::Json(e),
        }
    }
}

impl Error {
    /// Returns `true` if this is the "no index at this root" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Error encountered while indexing a specific file.
///
/// These errors are collected during indexing but don't halt the run. The file
/// is skipped and any entry it had from a previous run is left untouched.
#[derive(Debug, Clone)]
pub struct IndexError {
    /// Path to the file that failed, relative to the indexed root
    pub path: String,
    /// Category of the error
    pub kind: IndexErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.path, self.message, self.kind)
    }
}

impl std::error::Error for IndexError {}

/// Categorization of indexing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorKind {
    // === Input Problems (analogous to HTTP 4xx) ===
    /// The parser rejected the file
    ParseFailed,

    /// The file's extension maps to no known language
    UnsupportedLanguage,

    /// The language is known but no parser is registered for it
    NoParser,

    /// File content is not valid UTF-8
    EncodingError,

    /// Discovery returned a path that cannot be stored in the index
    InvalidPath,

    // === Internal Problems (analogous to HTTP 5xx) ===
    /// Could not read the file from disk
    IoError,
}

impl std::fmt::Display for IndexErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailed => write!(f, "parse failed"),
            Self::UnsupportedLanguage => write!(f, "unsupported language"),
            Self::NoParser => write!(f, "no parser"),
            Self::EncodingError => write!(f, "encoding error"),
            Self::InvalidPath => write!(f, "invalid path"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl IndexErrorKind {
    /// Returns `true` if this is an input problem (4xx-style).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ParseFailed
                | Self::UnsupportedLanguage
                | Self::NoParser
                | Self::EncodingError
                | Self::InvalidPath
        )
    }

    /// Returns `true` if this is an internal problem (5xx-style).
    #[must_use]
    pub fn is_internal_error(&self) -> bool {
        matches!(self, Self::IoError)
    }
}

impl IndexError {
    /// Create a new indexing error.
    #[must_use]
    pub fn new(path: impl Into<String>, kind: IndexErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a parse error for a file.
    #[must_use]
    pub fn parse_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, IndexErrorKind::ParseFailed, message)
    }

    /// Create an unsupported language error.
    #[must_use]
    pub fn unsupported_language(path: impl Into<String>) -> Self {
        let path = path.into();
        let ext = std::path::Path::new(&path)
            .extension()
            .map_or_else(|| "none".to_string(), |e| e.to_string_lossy().to_string());
        Self::new(
            path,
            IndexErrorKind::UnsupportedLanguage,
            format!("unsupported extension: {ext}"),
        )
    }

    /// Create a missing-parser error.
    #[must_use]
    pub fn no_parser(path: impl Into<String>, language: &str) -> Self {
        Self::new(
            path,
            IndexErrorKind::NoParser,
            format!("no parser registered for {language}"),
        )
    }

    /// Create an encoding error for a file.
    #[must_use]
    pub fn encoding_error(path: impl Into<String>) -> Self {
        Self::new(path, IndexErrorKind::EncodingError, "file is not valid UTF-8")
    }

    /// Create an invalid-path error from the store's rejection.
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, error: &Error) -> Self {
        Self::new(path, IndexErrorKind::InvalidPath, error.to_string())
    }

    /// Create an I/O error for a file.
    #[must_use]
    pub fn io_error(path: impl Into<String>, error: &std::io::Error) -> Self {
        Self::new(path, IndexErrorKind::IoError, error.to_string())
    }
}
