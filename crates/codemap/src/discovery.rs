//! Source file discovery.

use crate::config::{IndexConfig, PathFilter};
use crate::error::Result;
use crate::languages::detect_language;
use crate::layout::INDEX_DIR;
use std::path::Path;
use tracing::{debug, warn};

/// Lists the files of a root that should be indexed.
pub trait FileDiscovery {
    /// Returns sorted, deduplicated paths relative to `root`, using `/` as the
    /// separator.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` itself cannot be read.
    fn discover(&self, root: &Path) -> Result<Vec<String>>;
}

/// Recursive filesystem walk driven by an [`IndexConfig`].
///
/// Skips hidden entries (unless configured), excluded directory names, the
/// index directory and symlinks. A file is kept when its language is known and
/// allowed, its relative path passes the include/exclude patterns, and it is
/// within the size limit. Unreadable subdirectories are logged and skipped.
#[derive(Debug, Clone)]
pub struct FsDiscovery {
    config: IndexConfig,
}

impl FsDiscovery {
    /// Creates a walker for `config`.
    #[must_use]
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    fn walk_dir(&self, filter: &PathFilter, dir: &Path, prefix: &str, files: &mut Vec<String>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(
                    directory = %dir.display(),
                    error = %e,
                    "Cannot read directory, skipping"
                );
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(
                        directory = %dir.display(),
                        error = %e,
                        "Failed to read directory entry, skipping"
                    );
                    continue;
                }
            };

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                debug!(path = %entry.path().display(), "Skipping non-UTF-8 file name");
                continue;
            };
            if name == INDEX_DIR || (name.starts_with('.') && !self.config.include_hidden) {
                continue;
            }

            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let rel = crate::layout::join(prefix, name);

            if file_type.is_dir() {
                if !self.config.is_excluded_dir(name) && !filter.excludes_dir(&rel) {
                    self.walk_dir(filter, &entry.path(), &rel, files);
                }
            } else if file_type.is_file()
                && filter.accepts_file(&rel)
                && self.accepts_file(&entry, &rel)
            {
                files.push(rel);
            }
        }
    }

    fn accepts_file(&self, entry: &std::fs::DirEntry, rel: &str) -> bool {
        let Some(language) = detect_language(rel) else {
            return false;
        };
        if !self.config.allows_language(language) {
            return false;
        }
        match entry.metadata() {
            Ok(meta) if meta.len() > self.config.max_file_size => {
                debug!(path = rel, size = meta.len(), "Skipping oversized file");
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(path = rel, error = %e, "Cannot stat file, skipping");
                false
            }
        }
    }
}

impl Default for FsDiscovery {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl FileDiscovery for FsDiscovery {
    fn discover(&self, root: &Path) -> Result<Vec<String>> {
        // Fail loudly when the root itself is unreadable; subdirectories only warn.
        std::fs::read_dir(root)?;
        let filter = self.config.path_filter()?;

        let mut files = Vec::new();
        self.walk_dir(&filter, root, "", &mut files);
        files.sort();
        files.dedup();
        debug!(root = %root.display(), files = files.len(), "Discovered files");
        Ok(files)
    }
}

impl<F> FileDiscovery for F
where
    F: Fn(&Path) -> Result<Vec<String>>,
{
    fn discover(&self, root: &Path) -> Result<Vec<String>> {
        self(root)
    }
}
