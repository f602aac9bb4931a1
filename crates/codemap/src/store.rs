//! The map store: persisted file entries for one indexed root.
//!
//! A [`MapStore`] owns the root manifest and every directory map of one root.
//! All mutations happen in memory; [`MapStore::save`] writes the modified maps
//! and the manifest (manifest last), and deletes the maps of directories that
//! became empty.
//!
//! ## Directory tracking
//!
//! `manifest.directories` holds every directory that has files, plus the
//! ancestors of those directories. A directory leaves the set once it has no
//! files of its own and no tracked descendants. [`MapStore::reconcile_directories`]
//! rebuilds the set from the map files on disk if it ever drifts.

use crate::error::{Error, Result};
use crate::layout::{self, IndexLayout, RelPath};
use crate::search::{self, SearchOptions, SymbolMatch};
use crate::types::{
    DirectoryMap, FileEntry, ManifestStats, RootManifest, Symbol, now_utc, retain_named, timestamp,
};
use chrono::{DateTime, Utc};
use codemap_json::{Loaded, Warning, read_json_resilient, remove_if_exists, write_json_atomic};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Non-fatal problems found while loading an index.
///
/// Corrupted documents are replaced by empty ones; the next successful
/// [`MapStore::save`] overwrites or removes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The root manifest could not be decoded; the index loads as empty.
    CorruptedManifest(Warning),

    /// A directory map could not be decoded; its entries are dropped.
    CorruptedDirectoryMap {
        /// The directory whose map was discarded.
        directory: String,
        /// The decode failure.
        warning: Warning,
    },

    /// The manifest was written for a different root path.
    RootMismatch {
        /// The root the store was opened with.
        expected: String,
        /// The root recorded in the manifest.
        found: String,
    },

    /// A directory map records a different directory than its location.
    DirectoryMismatch {
        /// Directory implied by the map's location.
        directory: String,
        /// Directory recorded inside the map.
        found: String,
    },
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CorruptedManifest(w) => write!(f, "corrupted manifest, starting empty: {w}"),
            Self::CorruptedDirectoryMap { directory, warning } => {
                write!(f, "corrupted map for '{directory}', entries dropped: {warning}")
            }
            Self::RootMismatch { expected, found } => {
                write!(f, "manifest was created for '{found}', opened as '{expected}'")
            }
            Self::DirectoryMismatch { directory, found } => {
                write!(f, "map at '{directory}' claims to be '{found}'")
            }
        }
    }
}

/// Denormalized view of one indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStructure<'a> {
    /// Relative path of the file.
    pub path: String,
    /// Content fingerprint.
    pub hash: &'a str,
    /// Language tag.
    pub language: &'a str,
    /// Total line count.
    pub lines: u32,
    /// When the file was last indexed.
    #[serde(serialize_with = "timestamp::serialize")]
    pub indexed_at: DateTime<Utc>,
    /// Top-level symbols with their nested children.
    pub symbols: &'a [Symbol],
}

/// Persistent symbol map for one root.
///
/// Not synchronized: one writer per root. Wrap in a mutex to share between
/// threads.
#[derive(Debug)]
pub struct MapStore {
    layout: IndexLayout,
    manifest: RootManifest,
    /// Directory maps of tracked, non-root directories that have files.
    maps: BTreeMap<String, DirectoryMap>,
    /// Directories whose map must be written on the next save.
    dirty: BTreeSet<String>,
    /// Directories whose map file must be deleted on the next save.
    removed: BTreeSet<String>,
    /// Delete untracked map files on the next save (set after corruption).
    sweep_orphans: bool,
    warnings: Vec<LoadWarning>,
}

impl MapStore {
    /// Opens the index for `root`, starting empty if none exists yet.
    ///
    /// A corrupted manifest also starts empty; see [`load_warnings`](Self::load_warnings).
    ///
    /// # Errors
    ///
    /// Returns an error if an existing index document cannot be read (e.g.,
    /// permission denied).
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = IndexLayout::new(root);
        match read_json_resilient::<RootManifest, _>(layout.manifest_path())? {
            Some(loaded) => Self::from_manifest(layout, loaded),
            None => {
                let manifest = RootManifest::new(display_root(&layout));
                Ok(Self::with_manifest(layout, manifest))
            }
        }
    }

    /// Loads an existing index for `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `root` has never been indexed, and an
    /// I/O error if an index document cannot be read. A corrupted manifest is
    /// not an error: the store loads empty and records a
    /// [`LoadWarning::CorruptedManifest`].
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = IndexLayout::new(root);
        let path = layout.manifest_path();
        match read_json_resilient::<RootManifest, _>(&path)? {
            Some(loaded) => Self::from_manifest(layout, loaded),
            None => Err(Error::NotFound { path }),
        }
    }

    fn with_manifest(layout: IndexLayout, manifest: RootManifest) -> Self {
        Self {
            layout,
            manifest,
            maps: BTreeMap::new(),
            dirty: BTreeSet::new(),
            removed: BTreeSet::new(),
            sweep_orphans: false,
            warnings: Vec::new(),
        }
    }

    fn from_manifest(layout: IndexLayout, loaded: Loaded<RootManifest>) -> Result<Self> {
        let requested_root = display_root(&layout);
        let (manifest, warning) = loaded.into_parts();

        let mut store = match warning {
            Some(warning) => {
                let mut store =
                    Self::with_manifest(layout, RootManifest::new(requested_root.clone()));
                store.sweep_orphans = true;
                store.warn(LoadWarning::CorruptedManifest(warning));
                store
            }
            None => {
                let found = manifest.root.clone();
                let mut store = Self::with_manifest(layout, manifest);
                if found != requested_root {
                    store.warn(LoadWarning::RootMismatch {
                        expected: requested_root,
                        found,
                    });
                }
                store
            }
        };

        let tracked: Vec<String> = store.manifest.directories.iter().cloned().collect();
        for directory in tracked {
            store.load_map(&directory)?;
        }
        store.prune_directories();

        debug!(
            root = %store.layout.root().display(),
            directories = store.maps.len(),
            warnings = store.warnings.len(),
            "Loaded index"
        );
        Ok(store)
    }

    /// Reads the map for `directory` into memory if it exists on disk.
    fn load_map(&mut self, directory: &str) -> Result<()> {
        match read_json_resilient::<DirectoryMap, _>(self.layout.map_path(directory))? {
            None => {}
            Some(Loaded::Parsed(mut map)) => {
                if map.directory != directory {
                    self.warn(LoadWarning::DirectoryMismatch {
                        directory: directory.to_string(),
                        found: std::mem::replace(&mut map.directory, directory.to_string()),
                    });
                    self.dirty.insert(directory.to_string());
                }
                self.maps.insert(directory.to_string(), map);
            }
            Some(Loaded::Defaulted { warning, .. }) => {
                self.warn(LoadWarning::CorruptedDirectoryMap {
                    directory: directory.to_string(),
                    warning,
                });
                self.removed.insert(directory.to_string());
            }
        }
        Ok(())
    }

    fn warn(&mut self, warning: LoadWarning) {
        warn!(root = %self.layout.root().display(), "{warning}");
        self.warnings.push(warning);
    }

    // === Accessors ===

    /// The storage layout of this index.
    #[must_use]
    pub fn layout(&self) -> &IndexLayout {
        &self.layout
    }

    /// The in-memory root manifest.
    #[must_use]
    pub fn manifest(&self) -> &RootManifest {
        &self.manifest
    }

    /// Tracked non-root directories.
    #[must_use]
    pub fn directories(&self) -> &BTreeSet<String> {
        &self.manifest.directories
    }

    /// Counters as of the last [`update_stats`](Self::update_stats).
    #[must_use]
    pub fn stats(&self) -> ManifestStats {
        self.manifest.stats
    }

    /// Problems found while loading, in discovery order.
    #[must_use]
    pub fn load_warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    // === Mutations ===

    /// Records the root and configuration snapshot in the manifest.
    pub fn set_metadata(&mut self, root: impl Into<String>, config: serde_json::Value) {
        self.manifest.root = root.into();
        self.manifest.config = config;
    }

    /// Inserts or replaces the entry for `rel_path`.
    ///
    /// Anonymous (empty-named) symbols are dropped and their children hoisted.
    /// Calling again with identical arguments changes nothing, including the
    /// entry's `indexed_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if `rel_path` is not a valid relative path.
    pub fn update_file(
        &mut self,
        rel_path: &str,
        hash: impl Into<String>,
        language: impl Into<String>,
        lines: u32,
        symbols: Vec<Symbol>,
    ) -> Result<()> {
        let rel = RelPath::parse(rel_path)?;
        let hash = hash.into();
        let language = language.into();
        let symbols = retain_named(symbols);

        let files = if rel.directory.is_empty() {
            &mut self.manifest.files
        } else {
            &mut self
                .maps
                .entry(rel.directory.clone())
                .or_insert_with(|| DirectoryMap::new(rel.directory.clone()))
                .files
        };

        let unchanged = files.get(&rel.file_name).is_some_and(|existing| {
            existing.hash == hash
                && existing.language == language
                && existing.lines == lines
                && existing.symbols == symbols
        });
        if !unchanged {
            files.insert(
                rel.file_name.clone(),
                FileEntry {
                    hash,
                    indexed_at: now_utc(),
                    language,
                    lines,
                    symbols,
                },
            );
        }

        if !rel.directory.is_empty() {
            if !unchanged {
                self.dirty.insert(rel.directory.clone());
            }
            self.removed.remove(&rel.directory);
            for ancestor in layout::ancestors(&rel.directory) {
                self.manifest.directories.insert(ancestor.to_string());
            }
        }
        Ok(())
    }

    /// Removes the entry for `rel_path`, returning whether it existed.
    ///
    /// If the owning directory becomes empty its map is scheduled for deletion
    /// and the directory (and any ancestor left with neither files nor tracked
    /// subdirectories) stops being tracked.
    pub fn remove_file(&mut self, rel_path: &str) -> bool {
        let Ok(rel) = RelPath::parse(rel_path) else {
            return false;
        };

        if rel.directory.is_empty() {
            return self.manifest.files.remove(&rel.file_name).is_some();
        }

        let Some(map) = self.maps.get_mut(&rel.directory) else {
            return false;
        };
        if map.files.remove(&rel.file_name).is_none() {
            return false;
        }

        if map.files.is_empty() {
            // The map file goes even when the directory stays tracked for
            // its subdirectories.
            self.maps.remove(&rel.directory);
            self.dirty.remove(&rel.directory);
            self.removed.insert(rel.directory.clone());
            self.untrack_empty_ancestors(&rel.directory);
        } else {
            self.dirty.insert(rel.directory);
        }
        true
    }

    /// Recomputes `total_files` and `total_symbols`.
    pub fn update_stats(&mut self) {
        let mut stats = ManifestStats::default();
        for (_, entry) in self.get_all_files() {
            stats.total_files += 1;
            stats.total_symbols += entry.symbol_count();
        }
        self.manifest.stats = stats;
    }

    /// Writes every modified directory map, then the manifest.
    ///
    /// Maps of directories that became empty are deleted. Every write is
    /// atomic, so a crash leaves each document either old or new.
    ///
    /// # Errors
    ///
    /// Returns any I/O or serialization failure. Pending changes stay pending
    /// so the save can be retried.
    pub fn save(&mut self) -> Result<()> {
        for directory in &self.removed {
            remove_if_exists(self.layout.map_path(directory))?;
            self.remove_empty_mirror_dirs(directory);
        }

        for directory in &self.dirty {
            if let Some(map) = self.maps.get(directory) {
                write_json_atomic(self.layout.map_path(directory), map)?;
            }
        }

        if self.sweep_orphans {
            self.delete_untracked_maps()?;
        }

        write_json_atomic(self.layout.manifest_path(), &self.manifest)?;

        info!(
            root = %self.layout.root().display(),
            written = self.dirty.len(),
            deleted = self.removed.len(),
            "Saved index"
        );
        self.dirty.clear();
        self.removed.clear();
        self.sweep_orphans = false;
        Ok(())
    }

    /// Deletes the persisted index and resets the store to empty.
    ///
    /// Only index documents are deleted; the index root itself is removed
    /// once nothing else is left in it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a document cannot be deleted.
    pub fn clear(&mut self) -> Result<()> {
        for map_path in self.find_map_files()? {
            remove_if_exists(&map_path)?;
        }
        remove_if_exists(self.layout.manifest_path())?;
        remove_empty_dirs(self.layout.index_root());

        let root = std::mem::take(&mut self.manifest.root);
        self.manifest = RootManifest::new(root);
        self.maps.clear();
        self.dirty.clear();
        self.removed.clear();
        self.sweep_orphans = false;
        info!(root = %self.layout.root().display(), "Cleared index");
        Ok(())
    }

    /// Rebuilds directory tracking from the map files on disk.
    ///
    /// Untracked maps that hold files are adopted (with their ancestors);
    /// tracked directories with neither files nor tracked subdirectories are
    /// dropped. Returns the number of directories added or dropped.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the index root cannot be scanned or a map
    /// cannot be read.
    pub fn reconcile_directories(&mut self) -> Result<usize> {
        let before = self.manifest.directories.clone();

        let on_disk: BTreeSet<String> = self
            .find_map_files()?
            .iter()
            .filter_map(|path| self.layout.directory_for_map(path))
            .collect();

        for directory in on_disk {
            if self.maps.contains_key(&directory) || self.removed.contains(&directory) {
                continue;
            }
            self.load_map(&directory)?;
            if self.has_files(&directory) {
                for ancestor in layout::ancestors(&directory) {
                    self.manifest.directories.insert(ancestor.to_string());
                }
            } else {
                self.maps.remove(&directory);
                self.removed.insert(directory);
            }
        }

        self.prune_directories();

        let changes = before
            .symmetric_difference(&self.manifest.directories)
            .count();
        if changes > 0 {
            warn!(
                root = %self.layout.root().display(),
                changes,
                "Directory tracking was out of sync with the index on disk"
            );
        }
        Ok(changes)
    }

    // === Queries ===

    /// Looks up the entry for `rel_path`.
    #[must_use]
    pub fn get_file(&self, rel_path: &str) -> Option<&FileEntry> {
        let rel = RelPath::parse(rel_path).ok()?;
        self.files_in(&rel.directory)?.get(&rel.file_name)
    }

    /// Returns a serializable view of the entry for `rel_path`.
    #[must_use]
    pub fn get_file_structure(&self, rel_path: &str) -> Option<FileStructure<'_>> {
        let rel = RelPath::parse(rel_path).ok()?;
        let entry = self.files_in(&rel.directory)?.get(&rel.file_name)?;
        Some(FileStructure {
            path: rel.to_path_string(),
            hash: &entry.hash,
            language: &entry.language,
            lines: entry.lines,
            indexed_at: entry.indexed_at,
            symbols: &entry.symbols,
        })
    }

    /// Iterates over every tracked file as `(relative path, entry)`.
    ///
    /// Root-level files come first, then each tracked directory in order.
    /// Calling it again starts over.
    pub fn get_all_files(&self) -> impl Iterator<Item = (String, &FileEntry)> + '_ {
        let root_files = self
            .manifest
            .files
            .iter()
            .map(|(name, entry)| (name.clone(), entry));

        let nested = self
            .manifest
            .directories
            .iter()
            .filter_map(|directory| self.maps.get(directory).map(|map| (directory, map)))
            .flat_map(|(directory, map)| {
                map.files
                    .iter()
                    .map(move |(name, entry)| (layout::join(directory, name), entry))
            });

        root_files.chain(nested)
    }

    /// Ranked lookup across every symbol in the index.
    #[must_use]
    pub fn find_symbol(&self, query: &str, options: &SearchOptions) -> Vec<SymbolMatch> {
        search::rank(self.get_all_files(), query, options)
    }

    // === Internals ===

    fn files_in(&self, directory: &str) -> Option<&BTreeMap<String, FileEntry>> {
        if directory.is_empty() {
            Some(&self.manifest.files)
        } else {
            self.maps.get(directory).map(|map| &map.files)
        }
    }

    fn has_files(&self, directory: &str) -> bool {
        self.maps
            .get(directory)
            .is_some_and(|map| !map.files.is_empty())
    }

    fn has_tracked_descendant(&self, directory: &str) -> bool {
        // Descendants sort contiguously from "directory/".
        self.manifest
            .directories
            .range(format!("{directory}/")..)
            .next()
            .is_some_and(|candidate| layout::is_descendant(candidate, directory))
    }

    /// Stops tracking `directory` and each ancestor that has neither files nor
    /// tracked subdirectories, scheduling their maps for deletion.
    fn untrack_empty_ancestors(&mut self, directory: &str) {
        for ancestor in layout::ancestors(directory) {
            if self.has_files(ancestor) || self.has_tracked_descendant(ancestor) {
                break;
            }
            self.manifest.directories.remove(ancestor);
            self.maps.remove(ancestor);
            self.dirty.remove(ancestor);
            self.removed.insert(ancestor.to_string());
        }
    }

    /// Drops every tracked directory that has neither files nor tracked
    /// subdirectories.
    fn prune_directories(&mut self) {
        // Reverse order visits descendants before their ancestors.
        let tracked: Vec<String> = self.manifest.directories.iter().rev().cloned().collect();
        for directory in tracked {
            if !self.has_files(&directory) && !self.has_tracked_descendant(&directory) {
                debug!(directory = %directory, "Dropping empty directory from tracking");
                self.manifest.directories.remove(&directory);
                self.maps.remove(&directory);
                self.dirty.remove(&directory);
                self.removed.insert(directory);
            }
        }
    }

    /// All directory map files under the index root (the manifest excluded).
    fn find_map_files(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        collect_map_files(self.layout.index_root(), &mut found)?;
        found.retain(|path| *path != self.layout.manifest_path());
        found.sort();
        Ok(found)
    }

    fn delete_untracked_maps(&self) -> Result<()> {
        for path in self.find_map_files()? {
            let tracked = self
                .layout
                .directory_for_map(&path)
                .is_some_and(|directory| self.maps.contains_key(&directory));
            if !tracked {
                debug!(path = %path.display(), "Deleting orphaned directory map");
                remove_if_exists(&path)?;
                if let Some(parent) = path.parent() {
                    remove_empty_dirs(parent);
                }
            }
        }
        Ok(())
    }

    /// Removes now-empty mirror directories from `directory` up to, but not
    /// including, the index root.
    fn remove_empty_mirror_dirs(&self, directory: &str) {
        for ancestor in layout::ancestors(directory) {
            if std::fs::remove_dir(self.layout.map_dir(ancestor)).is_err() {
                break;
            }
        }
    }
}

fn display_root(layout: &IndexLayout) -> String {
    layout.root().display().to_string()
}

/// Recursively collects files named like a directory map under `dir`.
///
/// A missing directory yields nothing.
fn collect_map_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_map_files(&path, found)?;
        } else if path.file_name().is_some_and(|name| name == layout::MAP_FILENAME) {
            found.push(path);
        }
    }
    Ok(())
}

/// Removes `dir` and its subdirectories bottom-up, stopping at anything that
/// still has content.
fn remove_empty_dirs(dir: &Path) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                remove_empty_dirs(&path);
            }
        }
    }
    if let Err(e) = std::fs::remove_dir(dir) {
        debug!(path = %dir.display(), error = %e, "Keeping non-empty directory");
    }
}
