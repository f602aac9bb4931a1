//! Language detection and the parser seam.
//!
//! Symbol extraction is pluggable: each language registers a
//! [`LanguageParser`] in a [`ParserRegistry`]. The indexer asks the registry
//! for the parser of a file's detected language and treats "no parser" as
//! distinct from "the parser failed".
//!
//! ## Adding a Language
//!
//! 1. Add its extensions to [`EXTENSIONS`]
//! 2. Implement [`LanguageParser`]
//! 3. Register it with [`ParserRegistry::register`]

use crate::types::Symbol;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Known file extensions (lowercase, without the dot) and their language tags.
pub const EXTENSIONS: &[(&str, &str)] = &[
    ("py", "python"),
    ("pyi", "python"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("md", "markdown"),
    ("markdown", "markdown"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("swift", "swift"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("hh", "cpp"),
    ("html", "html"),
    ("htm", "html"),
    ("css", "css"),
    ("php", "php"),
    ("cs", "csharp"),
    ("dart", "dart"),
    ("go", "go"),
    ("java", "java"),
    ("rs", "rust"),
    ("sql", "sql"),
    ("rb", "ruby"),
];

/// Detects a file's language tag from its extension (case-insensitive).
///
/// Returns `None` for unknown extensions and extension-less files.
#[must_use]
pub fn detect_language(path: impl AsRef<Path>) -> Option<&'static str> {
    let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
    EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, language)| *language)
}

/// Every language tag [`detect_language`] can return, in table order.
#[must_use]
pub fn known_languages() -> Vec<&'static str> {
    let mut languages: Vec<&'static str> = Vec::new();
    for &(_, language) in EXTENSIONS {
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    languages
}

/// Extensions (with the leading dot) mapped to any of `languages`.
#[must_use]
pub fn extensions_for<S: AsRef<str>>(languages: &[S]) -> Vec<String> {
    EXTENSIONS
        .iter()
        .filter(|(_, language)| languages.iter().any(|wanted| wanted.as_ref() == *language))
        .map(|(ext, _)| format!(".{ext}"))
        .collect()
}

/// A parser rejected a file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    /// What went wrong, in the parser's words.
    pub message: String,
    /// 1-based line of the problem, if known.
    pub line: Option<u32>,
}

impl ParseError {
    /// Creates a parse error without a location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// Attaches the line where parsing failed.
    #[must_use]
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// Extracts symbols from the source text of one file.
///
/// Implementations must be thread-safe: the indexer may call `parse` for
/// different files concurrently.
pub trait LanguageParser: Send + Sync {
    /// Returns the top-level symbols of `source`, children nested inside.
    ///
    /// `path` is relative to the indexed root and is informational only.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the source cannot be parsed.
    fn parse(&self, source: &str, path: &Path) -> Result<Vec<Symbol>, ParseError>;
}

impl<F> LanguageParser for F
where
    F: Fn(&str, &Path) -> Result<Vec<Symbol>, ParseError> + Send + Sync,
{
    fn parse(&self, source: &str, path: &Path) -> Result<Vec<Symbol>, ParseError> {
        self(source, path)
    }
}

/// Language tag → parser.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn LanguageParser>>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parser` for `language`, replacing any previous one.
    pub fn register(&mut self, language: impl Into<String>, parser: impl LanguageParser + 'static) {
        self.parsers.insert(language.into(), Arc::new(parser));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, language: impl Into<String>, parser: impl LanguageParser + 'static) -> Self {
        self.register(language, parser);
        self
    }

    /// The parser for `language`, if one is registered.
    #[must_use]
    pub fn get(&self, language: &str) -> Option<&dyn LanguageParser> {
        self.parsers.get(language).map(AsRef::as_ref)
    }

    /// Returns `true` if a parser is registered for `language`.
    #[must_use]
    pub fn supports(&self, language: &str) -> bool {
        self.parsers.contains_key(language)
    }

    /// Registered language tags, sorted.
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}
