//! Domain types for the symbol map.
//!
//! These types represent the core domain model:
//! - **Symbol tree**: `Symbol`, `SymbolType`, `LineRange` (one file's structure)
//! - **Persisted records**: `FileEntry`, `DirectoryMap`, `RootManifest`
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Symbol type | Open string tag | Languages add kinds; the store stays language-agnostic |
//! | Line range | `[start, end]` on disk | Compact and matches existing index files |
//! | Optional fields | Omitted, never `null` | Re-serializing a loaded symbol reproduces it |
//! | Map ordering | `BTreeMap`/`BTreeSet` | Deterministic files and stable search tie-breaks |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

/// Schema version written into every manifest and directory map.
pub const SCHEMA_VERSION: &str = "1.0";

// ============================================================================
// Symbol tree
// ============================================================================

/// The kind of a symbol, as an open string tag.
///
/// Parsers may emit any tag. A handful of well-known values are provided as
/// constants for filters and for the search engine's synthesized `file`
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolType(Cow<'static, str>);

impl SymbolType {
    /// A class or class-like type.
    pub const CLASS: Self = Self(Cow::Borrowed("class"));
    /// A free function.
    pub const FUNCTION: Self = Self(Cow::Borrowed("function"));
    /// A method attached to a type.
    pub const METHOD: Self = Self(Cow::Borrowed("method"));
    /// An asynchronous method.
    pub const ASYNC_METHOD: Self = Self(Cow::Borrowed("async_method"));
    /// A document section (e.g., a Markdown heading).
    pub const SECTION: Self = Self(Cow::Borrowed("section"));
    /// A whole file. Only produced by search, never stored.
    pub const FILE: Self = Self(Cow::Borrowed("file"));

    /// Creates a symbol type from any tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    /// Returns the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SymbolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymbolType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for SymbolType {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl PartialEq<str> for SymbolType {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for SymbolType {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// An inclusive, 1-based line range with `start <= end`.
///
/// Serialized as a two-element array `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[u32; 2]", try_from = "[u32; 2]")]
pub struct LineRange {
    start: u32,
    end: u32,
}

impl LineRange {
    /// Creates a range covering `a..=b`, ordering the bounds if needed.
    #[must_use]
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// First line of the range.
    #[must_use]
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last line of the range.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of lines covered.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl From<LineRange> for [u32; 2] {
    fn from(range: LineRange) -> Self {
        [range.start, range.end]
    }
}

impl TryFrom<[u32; 2]> for LineRange {
    type Error = String;

    fn try_from([start, end]: [u32; 2]) -> Result<Self, Self::Error> {
        if start > end {
            return Err(format!("line range start {start} is after end {end}"));
        }
        Ok(Self { start, end })
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One structural unit of a file, possibly containing nested symbols.
///
/// Children are kept in extraction order. Once attached to a [`FileEntry`] a
/// tree is never edited; re-indexing replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol name. Empty only for anonymous nodes, which are not persisted.
    pub name: String,
    /// Kind tag.
    #[serde(rename = "type")]
    pub symbol_type: SymbolType,
    /// Lines covered by the symbol.
    pub lines: LineRange,
    /// Parameter list or type text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Free-form documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    /// Nested symbols.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Symbol>,
}

impl Symbol {
    /// Creates a leaf symbol without signature or docstring.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        symbol_type: impl Into<SymbolType>,
        start: u32,
        end: u32,
    ) -> Self {
        Self {
            name: name.into(),
            symbol_type: symbol_type.into(),
            lines: LineRange::new(start, end),
            signature: None,
            docstring: None,
            children: Vec::new(),
        }
    }

    /// Sets the signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Sets the docstring.
    #[must_use]
    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// Replaces the children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Symbol>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes in this tree, including `self`.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Symbol::count).sum::<usize>()
    }

    /// Iterates over this symbol and all descendants, depth-first in
    /// extraction order.
    pub fn walk(&self) -> SymbolWalk<'_> {
        SymbolWalk { stack: vec![self] }
    }
}

/// Depth-first, pre-order iterator over a symbol tree.
#[derive(Debug, Clone)]
pub struct SymbolWalk<'a> {
    stack: Vec<&'a Symbol>,
}

impl<'a> SymbolWalk<'a> {
    /// Walks a forest of top-level symbols in order.
    pub fn forest(symbols: &'a [Symbol]) -> Self {
        Self {
            stack: symbols.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for SymbolWalk<'a> {
    type Item = &'a Symbol;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Drops anonymous (empty-named) nodes, hoisting their children into the
/// enclosing list so named descendants are kept.
#[must_use]
pub fn retain_named(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut out = Vec::with_capacity(symbols.len());
    for mut symbol in symbols {
        let children = retain_named(std::mem::take(&mut symbol.children));
        if symbol.name.is_empty() {
            out.extend(children);
        } else {
            symbol.children = children;
            out.push(symbol);
        }
    }
    out
}

// ============================================================================
// Persisted records
// ============================================================================

/// Index record for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Content fingerprint.
    pub hash: String,
    /// When the file was last (re)indexed.
    #[serde(with = "timestamp")]
    pub indexed_at: DateTime<Utc>,
    /// Language tag.
    pub language: String,
    /// Total line count at index time.
    pub lines: u32,
    /// Top-level symbols in extraction order.
    #[serde(default)]
    pub symbols: Vec<Symbol>,
}

impl FileEntry {
    /// Number of symbols in the file, nested ones included.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.iter().map(Symbol::count).sum()
    }

    /// Iterates over every symbol, depth-first in extraction order.
    pub fn walk_symbols(&self) -> SymbolWalk<'_> {
        SymbolWalk::forest(&self.symbols)
    }
}

/// The file entries of exactly one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMap {
    /// Schema version.
    pub version: String,
    /// Directory relative to the root, forward slashes.
    pub directory: String,
    /// Basename to entry.
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,
}

impl DirectoryMap {
    /// Creates an empty map for `directory`.
    #[must_use]
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            directory: directory.into(),
            files: BTreeMap::new(),
        }
    }
}

impl Default for DirectoryMap {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// Aggregate counters, refreshed by [`MapStore::update_stats`](crate::MapStore::update_stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStats {
    /// Number of indexed files.
    #[serde(default)]
    pub total_files: usize,
    /// Number of symbols, nested ones included.
    #[serde(default)]
    pub total_symbols: usize,
}

/// Top-level record for one indexed root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootManifest {
    /// Schema version.
    pub version: String,
    /// The indexed root, as given when the index was created.
    pub root: String,
    /// Snapshot of the configuration that produced the index.
    #[serde(default)]
    pub config: serde_json::Value,
    /// Non-root directories that have a directory map.
    #[serde(default)]
    pub directories: BTreeSet<String>,
    /// Aggregate counters.
    #[serde(default)]
    pub stats: ManifestStats,
    /// Entries for files directly under the root.
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,
}

impl RootManifest {
    /// Creates an empty manifest for `root`.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            root: root.into(),
            config: serde_json::Value::Object(serde_json::Map::new()),
            directories: BTreeSet::new(),
            stats: ManifestStats::default(),
            files: BTreeMap::new(),
        }
    }
}

impl Default for RootManifest {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// `indexed_at` wire format: `2025-01-01T00:00:00Z`.
///
/// RFC 3339 timestamps with offsets or fractional seconds are accepted on read.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, FORMAT) {
            return Ok(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
    }
}

/// Current time truncated to whole seconds, matching the wire format.
pub(crate) fn now_utc() -> DateTime<Utc> {
    use chrono::SubsecRound;
    Utc::now().trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(symbols: Vec<Symbol>) -> FileEntry {
        FileEntry {
            hash: "abc123".to_string(),
            indexed_at: timestamp::parse("2025-01-01T00:00:00Z").unwrap(),
            language: "python".to_string(),
            lines: 50,
            symbols,
        }
    }

    #[test]
    fn symbol_omits_absent_fields() {
        let value = serde_json::to_value(Symbol::new("func", "function", 1, 10)).unwrap();
        assert_eq!(value, json!({"name": "func", "type": "function", "lines": [1, 10]}));
    }

    #[test]
    fn symbol_full_serialization() {
        let sym = Symbol::new("MyClass", SymbolType::CLASS, 1, 50)
            .with_docstring("A class that does things.")
            .with_children(vec![
                Symbol::new("method", SymbolType::METHOD, 10, 20).with_signature("(self, x: int)"),
            ]);
        let value = serde_json::to_value(&sym).unwrap();

        assert_eq!(value["docstring"], "A class that does things.");
        assert_eq!(value["children"][0]["signature"], "(self, x: int)");
        assert!(value["children"][0].get("children").is_none());
    }

    #[test]
    fn symbol_omitted_fields_stay_omitted_after_reload() {
        let raw = json!({
            "name": "test",
            "type": "function",
            "lines": [5, 15],
            "signature": "(x: int) -> str",
            "children": [{"name": "nested", "type": "class", "lines": [7, 12]}]
        });
        let sym: Symbol = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(sym.lines, LineRange::new(5, 15));
        assert_eq!(sym.children[0].name, "nested");
        assert_eq!(serde_json::to_value(&sym).unwrap(), raw);
    }

    #[test]
    fn null_optional_fields_load_as_absent() {
        let sym: Symbol = serde_json::from_value(json!({
            "name": "f", "type": "function", "lines": [1, 1], "docstring": null
        }))
        .unwrap();
        assert!(sym.docstring.is_none());
    }

    #[test]
    fn reversed_line_range_is_rejected_on_read() {
        let result: Result<Symbol, _> =
            serde_json::from_value(json!({"name": "f", "type": "function", "lines": [9, 3]}));
        assert!(result.is_err());
    }

    #[test]
    fn line_range_new_orders_bounds() {
        let range = LineRange::new(9, 3);
        assert_eq!((range.start(), range.end()), (3, 9));
        assert_eq!(range.line_count(), 7);
    }

    #[test]
    fn unknown_symbol_types_round_trip() {
        let sym: Symbol = serde_json::from_value(json!({
            "name": "Widget", "type": "protocol_extension", "lines": [1, 2]
        }))
        .unwrap();
        assert_eq!(sym.symbol_type, "protocol_extension");
        assert_eq!(serde_json::to_value(&sym).unwrap()["type"], "protocol_extension");
    }

    #[test]
    fn walk_is_depth_first_in_extraction_order() {
        let tree = Symbol::new("A", "class", 1, 30).with_children(vec![
            Symbol::new("a1", "method", 2, 10)
                .with_children(vec![Symbol::new("inner", "function", 3, 4)]),
            Symbol::new("a2", "method", 11, 20),
        ]);
        let names: Vec<&str> = tree.walk().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "a1", "inner", "a2"]);
        assert_eq!(tree.count(), 4);
    }

    #[test]
    fn retain_named_hoists_children_of_anonymous_nodes() {
        let symbols = vec![
            Symbol::new("", "block", 1, 10).with_children(vec![Symbol::new("f", "function", 2, 3)]),
            Symbol::new("g", "function", 11, 12),
        ];
        let kept = retain_named(symbols);
        let names: Vec<&str> = kept.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["f", "g"]);
    }

    #[test]
    fn directory_map_round_trip() {
        let mut map = DirectoryMap::new("src/components");
        map.files.insert(
            "Button.py".to_string(),
            entry(vec![Symbol::new("Button", "class", 1, 50)]),
        );

        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value["files"]["Button.py"]["indexed_at"], "2025-01-01T00:00:00Z");

        let restored: DirectoryMap = serde_json::from_value(value).unwrap();
        assert_eq!(restored, map);
    }

    #[test]
    fn manifest_round_trip_and_legacy_shape() {
        let mut manifest = RootManifest::new("/test");
        manifest.config = json!({"languages": ["python"]});
        manifest.directories.insert("src".to_string());
        manifest.directories.insert("lib".to_string());

        let restored: RootManifest =
            serde_json::from_value(serde_json::to_value(&manifest).unwrap()).unwrap();
        assert_eq!(restored, manifest);

        let legacy: RootManifest = serde_json::from_value(json!({
            "version": "1.0",
            "root": "/test",
            "config": {},
            "directories": ["src"],
            "stats": {"total_files": 1, "total_symbols": 2}
        }))
        .unwrap();
        assert!(legacy.files.is_empty());
        assert_eq!(legacy.stats.total_symbols, 2);
    }

    #[test]
    fn timestamps_accept_rfc3339() {
        let ts = timestamp::parse("2025-01-01T02:00:00+02:00").unwrap();
        assert_eq!(ts.format(timestamp::FORMAT).to_string(), "2025-01-01T00:00:00Z");
        assert!(timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn file_entry_counts_nested_symbols() {
        let e = entry(vec![
            Symbol::new("C1", "class", 1, 15).with_children(vec![Symbol::new("m1", "method", 3, 10)]),
            Symbol::new("f1", "function", 16, 20),
        ]);
        assert_eq!(e.symbol_count(), 3);
    }
}
