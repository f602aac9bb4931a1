//! # Codemap: Persistent Symbol Map
//!
//! Codemap keeps a persistent, incrementally updated index of the structural
//! symbols (classes, functions, methods, sections, ...) of a source tree and
//! answers ranked lookups against it without re-scanning the tree.
//!
//! ## Design Philosophy
//!
//! - **Incremental** - Files are fingerprinted; unchanged files are never re-parsed
//! - **Sharded** - One small JSON map per directory, so an update rewrites only what changed
//! - **Crash-safe** - Every document is written to a temporary file and renamed into place
//! - **Self-healing** - Corrupted documents load as empty with a warning, never as an error
//! - **Parser agnostic** - Symbol extraction is a pluggable [`LanguageParser`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use codemap::{
//!     IndexConfig, Indexer, MapStore, ParseError, ParserRegistry, SearchOptions, Symbol, SymbolType,
//! };
//! use std::path::Path;
//!
//! fn headings(source: &str, _: &Path) -> Result<Vec<Symbol>, ParseError> {
//!     Ok(source
//!         .lines()
//!         .enumerate()
//!         .filter_map(|(i, line)| line.strip_prefix("# ").map(|title| (i, title)))
//!         .map(|(i, title)| {
//!             let line = u32::try_from(i + 1).unwrap_or(u32::MAX);
//!             Symbol::new(title, SymbolType::SECTION, line, line)
//!         })
//!         .collect())
//! }
//!
//! let parsers = ParserRegistry::new().with("markdown", headings);
//! let mut store = MapStore::new("/path/to/project")?;
//! let indexer = Indexer::new("/path/to/project", IndexConfig::default(), parsers)?;
//!
//! let summary = indexer.index(&mut store)?;
//! println!("{} parsed, {} unchanged", summary.files_parsed, summary.files_unchanged);
//!
//! for hit in store.find_symbol("pricing", &SearchOptions::default().fuzzy()) {
//!     println!("{} {} {}:{}", hit.score, hit.symbol_type, hit.file, hit.lines);
//! }
//! # Ok::<(), codemap::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod discovery;
mod error;
mod indexer;
mod languages;
pub mod layout;
pub mod search;
mod store;
mod types;

pub use config::{
    DEFAULT_EXCLUDE_DIRS, DEFAULT_MAX_FILE_SIZE, IndexConfig, PathFilter, compile_patterns,
    default_include_patterns, is_glob_pattern, match_files_to_pattern,
};
pub use discovery::{FileDiscovery, FsDiscovery};
pub use error::{Error, IndexError, IndexErrorKind, Result};
pub use indexer::{IndexSummary, Indexer, StalenessReport, fingerprint};
pub use languages::{
    EXTENSIONS, LanguageParser, ParseError, ParserRegistry, detect_language, extensions_for,
    known_languages,
};
pub use layout::{INDEX_DIR, IndexLayout, MAP_FILENAME};
pub use search::{SearchOptions, SymbolMatch};
pub use store::{FileStructure, LoadWarning, MapStore};
pub use types::{
    DirectoryMap, FileEntry, LineRange, ManifestStats, RootManifest, SCHEMA_VERSION, Symbol,
    SymbolType, SymbolWalk, retain_named,
};
