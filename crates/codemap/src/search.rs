//! Ranked symbol lookup.
//!
//! Every candidate string is scored against the query, case-insensitively:
//!
//! | Tier | Condition | Score |
//! |------|-----------|-------|
//! | Exact | query equals candidate | 1.0 |
//! | Substring | query occurs in candidate | 0.9 |
//! | All words | every query word is a candidate word | 0.7 |
//! | Most words | at least half of the query words match | 0.5 |
//! | Fuzzy (opt-in) | edit-distance similarity >= 0.6 | `0.4 * similarity` |
//!
//! Words are split on whitespace and hyphens. Fuzzy scores are capped below
//! the word tiers, so a typo never outranks a real hit.

use crate::types::{FileEntry, LineRange, SymbolType};
use serde::Serialize;
use std::collections::HashSet;

/// Score for an exact (case-insensitive) match.
pub const EXACT_SCORE: f64 = 1.0;
/// Score when the query is a substring of the candidate.
pub const SUBSTRING_SCORE: f64 = 0.9;
/// Score when every query word appears in the candidate.
pub const ALL_WORDS_SCORE: f64 = 0.7;
/// Score when at least half of the query words appear in the candidate.
pub const MOST_WORDS_SCORE: f64 = 0.5;
/// Minimum normalized similarity for a fuzzy hit.
pub const FUZZY_THRESHOLD: f64 = 0.6;
/// Upper bound of fuzzy scores (exclusive of the word tiers).
pub const FUZZY_CEILING: f64 = 0.4;

/// Options for [`MapStore::find_symbol`](crate::MapStore::find_symbol).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Also match file names, docstrings, and near-miss spellings.
    pub fuzzy: bool,
    /// Only return records of this type.
    pub symbol_type: Option<SymbolType>,
    /// Keep at most this many records after ranking.
    pub limit: Option<usize>,
}

impl SearchOptions {
    /// Enables fuzzy mode.
    #[must_use]
    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = true;
        self
    }

    /// Restricts results to one symbol type.
    #[must_use]
    pub fn with_type(mut self, symbol_type: impl Into<SymbolType>) -> Self {
        self.symbol_type = Some(symbol_type.into());
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn accepts(&self, symbol_type: &SymbolType) -> bool {
        self.symbol_type.as_ref().is_none_or(|wanted| wanted == symbol_type)
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMatch {
    /// Symbol name, or the basename for file records.
    pub name: String,
    /// Symbol type; [`SymbolType::FILE`] for file records.
    #[serde(rename = "type")]
    pub symbol_type: SymbolType,
    /// Relative path of the owning file.
    pub file: String,
    /// Lines covered.
    pub lines: LineRange,
    /// Signature, if the symbol has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Relevance in `(0.0, 1.0]`.
    pub score: f64,
}

/// A lowercased query and its word set, computed once per search.
#[derive(Debug, Clone)]
pub struct QueryTerms {
    text: String,
    words: HashSet<String>,
}

impl QueryTerms {
    /// Prepares `query` for scoring.
    #[must_use]
    pub fn new(query: &str) -> Self {
        let text = query.to_lowercase();
        let words = split_words(&text).map(str::to_string).collect();
        Self { text, words }
    }

    /// Scores `candidate` against this query.
    #[must_use]
    pub fn score(&self, candidate: &str, fuzzy: bool) -> f64 {
        let candidate = candidate.to_lowercase();

        if self.text == candidate {
            return EXACT_SCORE;
        }
        if candidate.contains(&self.text) {
            return SUBSTRING_SCORE;
        }

        if !self.words.is_empty() {
            let candidate_words: HashSet<&str> = split_words(&candidate).collect();
            let found = self
                .words
                .iter()
                .filter(|w| candidate_words.contains(w.as_str()))
                .count();
            #[allow(clippy::cast_precision_loss)]
            let ratio = found as f64 / self.words.len() as f64;
            if found == self.words.len() {
                return ALL_WORDS_SCORE;
            }
            if ratio >= 0.5 {
                return MOST_WORDS_SCORE;
            }
        }

        if fuzzy {
            let similarity = similarity(&self.text, &candidate);
            if similarity >= FUZZY_THRESHOLD {
                return FUZZY_CEILING * similarity;
            }
        }
        0.0
    }
}

/// Scores `candidate` against `query`.
///
/// Convenience wrapper around [`QueryTerms::score`] for one-off comparisons.
#[must_use]
pub fn score(query: &str, candidate: &str, fuzzy: bool) -> f64 {
    QueryTerms::new(query).score(candidate, fuzzy)
}

/// Normalized edit-distance similarity in `[0.0, 1.0]`.
///
/// `1 - levenshtein(a, b) / max(len(a), len(b))`, counted in characters. Two
/// empty strings are identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }

    // The length difference is a lower bound on the distance; skip the
    // quadratic pass when it already rules out a fuzzy hit.
    let bound = 1.0 - a.len().abs_diff(b.len()) as f64 / longest as f64;
    if bound < FUZZY_THRESHOLD {
        return bound;
    }

    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal
            } else {
                1 + diagonal.min(row[j]).min(above)
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
}

/// Ranks every candidate in `files` against `query`.
///
/// `files` is consumed in traversal order, which becomes the tie-break order
/// among equal scores. Within a file the synthesized file record (fuzzy mode
/// only) comes first, then symbols depth-first in extraction order.
pub fn rank<'a, I>(files: I, query: &str, options: &SearchOptions) -> Vec<SymbolMatch>
where
    I: IntoIterator<Item = (String, &'a FileEntry)>,
{
    let terms = QueryTerms::new(query);
    let mut matches = Vec::new();

    for (path, entry) in files {
        if options.fuzzy && options.accepts(&SymbolType::FILE) {
            let basename = path.rsplit('/').next().unwrap_or(path.as_str());
            let score = terms.score(basename, true);
            if score > 0.0 {
                matches.push(SymbolMatch {
                    name: basename.to_string(),
                    symbol_type: SymbolType::FILE,
                    file: path.clone(),
                    lines: LineRange::new(1, entry.lines.max(1)),
                    signature: None,
                    score,
                });
            }
        }

        for symbol in entry.walk_symbols() {
            if !options.accepts(&symbol.symbol_type) {
                continue;
            }

            let mut score = terms.score(&symbol.name, options.fuzzy);
            if options.fuzzy {
                if let Some(doc) = &symbol.docstring {
                    score = score.max(terms.score(doc, true));
                }
            }

            if score > 0.0 {
                matches.push(SymbolMatch {
                    name: symbol.name.clone(),
                    symbol_type: symbol.symbol_type.clone(),
                    file: path.clone(),
                    lines: symbol.lines,
                    signature: symbol.signature.clone(),
                    score,
                });
            }
        }
    }

    // Stable: equal scores keep traversal order.
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    if let Some(limit) = options.limit {
        matches.truncate(limit);
    }
    matches
}
