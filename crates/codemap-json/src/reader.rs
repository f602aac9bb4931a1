//! Resilient reading of JSON documents.

use crate::{Result, Warning};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::warn;

/// The outcome of reading a document that exists on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    /// The document decoded cleanly.
    Parsed(T),

    /// The document was corrupted; `value` is `T::default()`.
    Defaulted {
        /// The substitute value.
        value: T,
        /// What went wrong while decoding.
        warning: Warning,
    },
}

impl<T> Loaded<T> {
    /// Returns the loaded (or substituted) value.
    #[must_use]
    pub fn value(&self) -> &T {
        match self {
            Self::Parsed(value) | Self::Defaulted { value, .. } => value,
        }
    }

    /// Returns the warning, if the document had to be defaulted.
    #[must_use]
    pub fn warning(&self) -> Option<&Warning> {
        match self {
            Self::Parsed(_) => None,
            Self::Defaulted { warning, .. } => Some(warning),
        }
    }

    /// Returns `true` if the document was corrupted and replaced.
    #[must_use]
    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted { .. })
    }

    /// Splits into the value and the optional warning.
    #[must_use]
    pub fn into_parts(self) -> (T, Option<Warning>) {
        match self {
            Self::Parsed(value) => (value, None),
            Self::Defaulted { value, warning } => (value, Some(warning)),
        }
    }
}

/// Reads and decodes the JSON document at `path`.
///
/// Returns:
/// - `Ok(None)` if no file exists at `path`
/// - `Ok(Some(Loaded::Parsed(_)))` if the document decoded cleanly
/// - `Ok(Some(Loaded::Defaulted { .. }))` if the file exists but is not a
///   valid `T`; the warning is also logged
///
/// # Errors
///
/// Returns an error only for I/O failures other than the file being absent
/// (e.g., permission denied).
pub fn read_json_resilient<T, P>(path: P) -> Result<Option<Loaded<T>>>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(Loaded::Parsed(value))),
        Err(e) => {
            let warning = Warning::from_json_error(path, &e);
            warn!(
                path = %path.display(),
                kind = warning.kind(),
                error = %e,
                "Discarding corrupted document"
            );
            Ok(Some(Loaded::Defaulted {
                value: T::default(),
                warning,
            }))
        }
    }
}
