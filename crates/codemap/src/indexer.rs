//! Incremental indexing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Indexer::index                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Phase 1  (Sequential): discovery + previous fingerprints    │
//! │  Phase 2  (Parallel):   read, fingerprint, parse per file    │
//! │  Phase 3  (Sequential): update_file / remove_file on store   │
//! │  Phase 4  (Sequential): update_stats + save                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Phase 2 only reads; every store mutation happens on the calling thread.

use crate::config::IndexConfig;
use crate::discovery::{FileDiscovery, FsDiscovery};
use crate::error::{Error, IndexError, Result};
use crate::languages::{ParserRegistry, detect_language};
use crate::layout::RelPath;
use crate::store::MapStore;
use crate::types::Symbol;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Content fingerprint: lowercase hex SHA-256.
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Outcome of one indexing run.
#[derive(Debug, Clone, Default)]
pub struct IndexSummary {
    /// Files returned by discovery
    pub files_discovered: usize,
    /// Files parsed and written to the store
    pub files_parsed: usize,
    /// Files whose fingerprint matched the stored entry
    pub files_unchanged: usize,
    /// Stored entries removed because their file is gone
    pub files_removed: usize,
    /// Files skipped because of an error (see `errors`)
    pub files_skipped: usize,
    /// Per-file problems; none of them aborted the run
    pub errors: Vec<IndexError>,
    /// How long the run took
    pub duration: Duration,
}

impl IndexSummary {
    fn skip(&mut self, error: IndexError) {
        warn!(path = %error.path, kind = %error.kind, error = %error.message, "Skipping file");
        self.files_skipped += 1;
        self.errors.push(error);
    }
}

/// Files whose stored entry no longer matches the disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StalenessReport {
    /// Tracked files whose content changed
    pub modified: Vec<String>,
    /// Discovered files with no entry
    pub added: Vec<String>,
    /// Tracked files that were not discovered
    pub deleted: Vec<String>,
}

impl StalenessReport {
    /// Returns `true` if any file needs re-indexing.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        !(self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty())
    }
}

/// A file that was read and parsed, ready to be written to the store.
#[derive(Debug)]
struct ParsedFile {
    path: String,
    hash: String,
    language: &'static str,
    lines: u32,
    symbols: Vec<Symbol>,
}

#[derive(Debug)]
enum Outcome {
    Unchanged,
    Parsed(ParsedFile),
    Failed(IndexError),
}

/// Keeps a [`MapStore`] in sync with the files under its root.
#[derive(Debug)]
pub struct Indexer<D = FsDiscovery> {
    root: PathBuf,
    config: IndexConfig,
    parsers: ParserRegistry,
    discovery: D,
}

impl Indexer<FsDiscovery> {
    /// Creates an indexer that walks `root` with [`FsDiscovery`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `config` is invalid.
    pub fn new(root: impl Into<PathBuf>, config: IndexConfig, parsers: ParserRegistry) -> Result<Self> {
        config.validate()?;
        let discovery = FsDiscovery::new(config.clone());
        Ok(Self {
            root: root.into(),
            config,
            parsers,
            discovery,
        })
    }
}

impl<D: FileDiscovery + Sync> Indexer<D> {
    /// Replaces the discovery strategy.
    #[must_use]
    pub fn with_discovery<E: FileDiscovery>(self, discovery: E) -> Indexer<E> {
        Indexer {
            root: self.root,
            config: self.config,
            parsers: self.parsers,
            discovery,
        }
    }

    /// The indexed root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Brings `store` up to date and saves it.
    ///
    /// Unchanged files are skipped; files that cannot be read or parsed are
    /// reported in [`IndexSummary::errors`] and keep any entry they had.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or the store cannot be saved.
    pub fn index(&self, store: &mut MapStore) -> Result<IndexSummary> {
        let start = Instant::now();
        let mut summary = IndexSummary::default();

        let files = self.discovery.discover(&self.root)?;
        summary.files_discovered = files.len();

        let previous: HashMap<String, String> = store
            .get_all_files()
            .map(|(path, entry)| (path, entry.hash.clone()))
            .collect();

        let prepare = |path: &String| self.prepare(path, previous.get(path).map(String::as_str));
        let outcomes: Vec<Outcome> = if self.config.parallel {
            files.par_iter().map(prepare).collect()
        } else {
            files.iter().map(prepare).collect()
        };

        for outcome in outcomes {
            match outcome {
                Outcome::Unchanged => summary.files_unchanged += 1,
                Outcome::Parsed(file) => {
                    debug!(path = %file.path, symbols = file.symbols.len(), "Indexed file");
                    let path = file.path;
                    match store.update_file(&path, file.hash, file.language, file.lines, file.symbols) {
                        Ok(()) => summary.files_parsed += 1,
                        Err(e @ Error::InvalidPath { .. }) => {
                            summary.skip(IndexError::invalid_path(path, &e));
                        }
                        Err(e) => return Err(e),
                    }
                }
                Outcome::Failed(error) => summary.skip(error),
            }
        }

        let discovered: BTreeSet<&str> = files.iter().map(String::as_str).collect();
        let mut deleted: Vec<String> = previous
            .into_keys()
            .filter(|path| !discovered.contains(path.as_str()))
            .collect();
        deleted.sort_unstable();
        for path in &deleted {
            if store.remove_file(path) {
                debug!(path = %path, "Removed deleted file from index");
                summary.files_removed += 1;
            }
        }

        store.set_metadata(self.root.display().to_string(), self.config.snapshot()?);
        store.update_stats();
        store.save()?;

        summary.duration = start.elapsed();
        info!(
            root = %self.root.display(),
            discovered = summary.files_discovered,
            parsed = summary.files_parsed,
            unchanged = summary.files_unchanged,
            removed = summary.files_removed,
            skipped = summary.files_skipped,
            duration_ms = u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            "Indexing complete"
        );
        Ok(summary)
    }

    /// Deletes the persisted index and indexes every file from scratch.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be cleared, discovery fails, or
    /// the store cannot be saved.
    pub fn rebuild(&self, store: &mut MapStore) -> Result<IndexSummary> {
        store.clear()?;
        self.index(store)
    }

    /// Compares the store against the disk without parsing or writing.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub fn check_staleness(&self, store: &MapStore) -> Result<StalenessReport> {
        let files = self.discovery.discover(&self.root)?;
        let mut report = StalenessReport::default();

        for path in &files {
            let Some(entry) = store.get_file(path) else {
                report.added.push(path.clone());
                continue;
            };
            // An unreadable file cannot be confirmed fresh.
            let current = std::fs::read(self.root.join(path)).ok().map(|b| fingerprint(&b));
            if current.as_deref() != Some(entry.hash.as_str()) {
                report.modified.push(path.clone());
            }
        }

        let discovered: BTreeSet<&str> = files.iter().map(String::as_str).collect();
        report.deleted = store
            .get_all_files()
            .map(|(path, _)| path)
            .filter(|path| !discovered.contains(path.as_str()))
            .collect();

        Ok(report)
    }

    /// Reads, fingerprints and parses one file. Touches no shared state.
    fn prepare(&self, path: &str, previous_hash: Option<&str>) -> Outcome {
        if let Err(e) = RelPath::parse(path) {
            return Outcome::Failed(IndexError::invalid_path(path, &e));
        }

        let bytes = match std::fs::read(self.root.join(path)) {
            Ok(bytes) => bytes,
            Err(e) => return Outcome::Failed(IndexError::io_error(path, &e)),
        };

        let hash = fingerprint(&bytes);
        if previous_hash == Some(hash.as_str()) {
            return Outcome::Unchanged;
        }

        let Some(language) = detect_language(path) else {
            return Outcome::Failed(IndexError::unsupported_language(path));
        };
        let Some(parser) = self.parsers.get(language) else {
            return Outcome::Failed(IndexError::no_parser(path, language));
        };
        let Ok(source) = String::from_utf8(bytes) else {
            return Outcome::Failed(IndexError::encoding_error(path));
        };

        let lines = u32::try_from(source.lines().count()).unwrap_or(u32::MAX);
        match parser.parse(&source, Path::new(path)) {
            Ok(symbols) => Outcome::Parsed(ParsedFile {
                path: path.to_string(),
                hash,
                language,
                lines,
                symbols,
            }),
            Err(e) => Outcome::Failed(IndexError::parse_failed(path, e.to_string())),
        }
    }
}
