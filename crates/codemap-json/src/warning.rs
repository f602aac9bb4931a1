//! Warning types for documents that exist but cannot be decoded.
//!
//! A [`Warning`] is produced instead of an error when a persisted document is
//! corrupted. Callers fall back to a default value and keep going; the warning
//! tells them (and the user) what was discarded.
//!
//! # Examples
//!
//! ```
//! use codemap_json::Warning;
//! use std::path::PathBuf;
//!
//! let warning = Warning::MalformedJson {
//!     path: PathBuf::from(".codemap/.codemap.json"),
//!     line: 1,
//!     column: 3,
//!     error: "key must be a string".to_string(),
//! };
//! assert_eq!(warning.kind(), "malformed_json");
//! assert!(warning.description().contains("line 1"));
//! ```

use std::path::{Path, PathBuf};

/// A non-fatal problem found while reading a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The file is not syntactically valid JSON (including truncation).
    MalformedJson {
        /// The document that failed to decode.
        path: PathBuf,
        /// 1-based line of the error.
        line: usize,
        /// 1-based column of the error.
        column: usize,
        /// Description of the JSON syntax error.
        error: String,
    },

    /// The file is valid JSON but does not have the expected shape.
    InvalidDocument {
        /// The document that failed to decode.
        path: PathBuf,
        /// Description of the mismatch.
        error: String,
    },
}

impl Warning {
    /// Builds a warning from a decode failure.
    ///
    /// Syntax and end-of-input errors become [`Warning::MalformedJson`];
    /// everything else becomes [`Warning::InvalidDocument`].
    #[must_use]
    pub fn from_json_error(path: &Path, error: &serde_json::Error) -> Self {
        use serde_json::error::Category;

        match error.classify() {
            Category::Syntax | Category::Eof => Self::MalformedJson {
                path: path.to_path_buf(),
                line: error.line(),
                column: error.column(),
                error: error.to_string(),
            },
            Category::Data | Category::Io => Self::InvalidDocument {
                path: path.to_path_buf(),
                error: error.to_string(),
            },
        }
    }

    /// Returns the path of the offending document.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::MalformedJson { path, .. } | Self::InvalidDocument { path, .. } => path,
        }
    }

    /// Returns a human-readable description of the warning.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::MalformedJson {
                path,
                line,
                column,
                error,
            } => format!(
                "{}: malformed JSON at line {line}, column {column}: {error}",
                path.display()
            ),
            Self::InvalidDocument { path, error } => {
                format!("{}: invalid document: {error}", path.display())
            }
        }
    }

    /// Returns a static string identifying the warning kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedJson { .. } => "malformed_json",
            Self::InvalidDocument { .. } => "invalid_document",
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for Warning {}
