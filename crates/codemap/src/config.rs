//! Indexing configuration.

use crate::error::{Error, Result};
use crate::languages::{EXTENSIONS, known_languages};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// Directory names skipped by default, wherever they appear.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "target",
    "node_modules",
    "vendor",
    "bin",
    "obj",
    "build",
    "dist",
    "__pycache__",
    "venv",
];

/// Files larger than this are skipped by default (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// One `**/*.<ext>` include pattern per known extension, in table order.
#[must_use]
pub fn default_include_patterns() -> Vec<String> {
    EXTENSIONS.iter().map(|(ext, _)| format!("**/*.{ext}")).collect()
}

/// Returns `true` if `pattern` contains glob metacharacters.
///
/// Literal paths such as `src/main.py` are not globs.
#[must_use]
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Compiles `patterns` into one matcher.
///
/// `*` also crosses `/`, and matching ignores case so patterns agree with
/// extension detection.
///
/// # Errors
///
/// Returns [`Error::Config`] naming the first pattern that does not compile.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("invalid pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("invalid patterns: {e}")))
}

/// Returns the entries of `files` matching `pattern`, sorted.
///
/// Backslashes in the paths are read as `/`.
///
/// # Errors
///
/// Returns [`Error::Config`] if `pattern` is not a valid glob.
pub fn match_files_to_pattern<I, S>(files: I, pattern: &str) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let matcher = compile_patterns(&[pattern])?;
    let mut matches: Vec<String> = files
        .into_iter()
        .map(|file| file.as_ref().replace('\\', "/"))
        .filter(|file| matcher.is_match(file))
        .collect();
    matches.sort();
    Ok(matches)
}

/// Compiled include/exclude patterns of an [`IndexConfig`].
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    /// Returns `true` if the file at `rel_path` passes both pattern lists.
    #[must_use]
    pub fn accepts_file(&self, rel_path: &str) -> bool {
        self.include.as_ref().is_none_or(|set| set.is_match(rel_path))
            && !self.exclude.is_match(rel_path)
    }

    /// Returns `true` if an exclude pattern names the directory `rel_path`.
    #[must_use]
    pub fn excludes_dir(&self, rel_path: &str) -> bool {
        self.exclude.is_match(rel_path)
    }
}

/// Settings for one indexing run.
///
/// A snapshot is stored in the manifest's `config` field so a later reader can
/// tell what produced the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Language tags to index. Empty means every detected language.
    pub languages: Vec<String>,
    /// Glob patterns a file's relative path must match. Empty means every file.
    pub include: Vec<String>,
    /// Glob patterns for relative paths to skip, files or directories.
    pub exclude: Vec<String>,
    /// Directory names skipped during discovery.
    pub exclude_dirs: Vec<String>,
    /// Also walk entries whose name starts with a dot.
    pub include_hidden: bool,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
    /// Parse files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            languages: known_languages().into_iter().map(String::from).collect(),
            include: default_include_patterns(),
            exclude: Vec::new(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|d| (*d).to_string()).collect(),
            include_hidden: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            parallel: true,
        }
    }
}

impl IndexConfig {
    /// Restricts indexing to `languages`.
    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if files of `language` should be indexed.
    #[must_use]
    pub fn allows_language(&self, language: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l == language)
    }

    /// Replaces the include patterns.
    #[must_use]
    pub fn with_include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds patterns for paths to skip.
    #[must_use]
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Compiles the include and exclude patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a pattern is not a valid glob.
    pub fn path_filter(&self) -> Result<PathFilter> {
        let include = if self.include.is_empty() {
            None
        } else {
            Some(compile_patterns(&self.include)?)
        };
        Ok(PathFilter {
            include,
            exclude: compile_patterns(&self.exclude)?,
        })
    }

    /// Returns `true` if directories named `name` are skipped.
    #[must_use]
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }

    /// Checks the settings for values that would make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_file_size` is zero, a language or
    /// excluded directory name is blank, or a pattern does not compile.
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(Error::Config("max_file_size must be greater than zero".into()));
        }
        if self.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(Error::Config("language tags must not be blank".into()));
        }
        if self.exclude_dirs.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::Config("excluded directory names must not be blank".into()));
        }
        self.path_filter()?;
        Ok(())
    }

    /// The snapshot stored in the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn snapshot(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_cover_every_known_language() {
        let config = IndexConfig::default();
        for language in [
            "python", "typescript", "javascript", "markdown", "yaml", "kotlin", "swift", "c",
            "cpp", "html", "css", "php", "csharp", "dart", "go", "java", "rust", "sql",
        ] {
            assert!(config.allows_language(language), "{language} missing from defaults");
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_language_list_allows_everything() {
        let config = IndexConfig::default().with_languages(Vec::<String>::new());
        assert!(config.allows_language("anything"));
    }

    #[test]
    fn language_filter_is_exact() {
        let config = IndexConfig::default().with_languages(["python"]);
        assert!(config.allows_language("python"));
        assert!(!config.allows_language("markdown"));
    }

    #[test]
    fn zero_max_file_size_is_rejected() {
        let config = IndexConfig {
            max_file_size: 0,
            ..IndexConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn default_include_patterns_cover_added_languages() {
        let patterns = default_include_patterns();
        for pattern in ["**/*.cs", "**/*.dart", "**/*.go", "**/*.java", "**/*.rs", "**/*.sql"] {
            assert!(
                patterns.iter().any(|p| p == pattern),
                "{pattern} missing from default include patterns"
            );
        }
    }

    #[rstest]
    #[case::star("*.py", true)]
    #[case::recursive("**/*.py", true)]
    #[case::directory_star("src/*", true)]
    #[case::nested_recursive("src/**/*.ts", true)]
    #[case::question("file?.py", true)]
    #[case::class("[ab].py", true)]
    #[case::literal_nested("src/main.py", false)]
    #[case::literal_name("main.py", false)]
    #[case::literal_deep("path/to/file.ts", false)]
    fn glob_detection(#[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(is_glob_pattern(pattern), expected);
    }

    #[test]
    fn simple_extension_pattern() {
        let files = ["main.py", "utils.py", "main.ts", "README.md"];
        assert_eq!(match_files_to_pattern(files, "*.py").unwrap(), ["main.py", "utils.py"]);
    }

    #[test]
    fn recursive_pattern_includes_root_files() {
        let files = ["main.py", "src/app.py", "src/components/button.py", "README.md"];
        let matches = match_files_to_pattern(files, "**/*.py").unwrap();
        assert_eq!(matches, ["main.py", "src/app.py", "src/components/button.py"]);
    }

    #[test]
    fn star_crosses_directory_separators() {
        let files = ["main.py", "src/app.py", "src/deep/utils.py", "lib/app.py"];
        let matches = match_files_to_pattern(files, "src/*.py").unwrap();
        assert_eq!(matches, ["src/app.py", "src/deep/utils.py"]);
    }

    #[test]
    fn no_matches_and_empty_input() {
        assert!(match_files_to_pattern(["main.py", "utils.py"], "*.ts").unwrap().is_empty());
        assert!(match_files_to_pattern(Vec::<String>::new(), "*.py").unwrap().is_empty());
    }

    #[test]
    fn matches_are_sorted() {
        let matches = match_files_to_pattern(["z.py", "a.py", "m.py"], "*.py").unwrap();
        assert_eq!(matches, ["a.py", "m.py", "z.py"]);
    }

    #[test]
    fn backslash_paths_match_slash_patterns() {
        let matches = match_files_to_pattern(["src\\main.py", "src\\utils.py"], "src/*.py").unwrap();
        assert_eq!(matches, ["src/main.py", "src/utils.py"]);
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let config = IndexConfig::default().with_exclude(["src/[oops"]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn path_filter_applies_include_then_exclude() {
        let filter = IndexConfig::default()
            .with_include(["src/**"])
            .with_exclude(["**/*_test.py", "src/generated"])
            .path_filter()
            .unwrap();

        assert!(filter.accepts_file("src/app.py"));
        assert!(!filter.accepts_file("lib/app.py"));
        assert!(!filter.accepts_file("src/app_test.py"));
        assert!(filter.excludes_dir("src/generated"));
        assert!(!filter.excludes_dir("src"));
    }

    #[test]
    fn empty_include_list_accepts_everything() {
        let filter = IndexConfig::default()
            .with_include(Vec::<String>::new())
            .path_filter()
            .unwrap();
        assert!(filter.accepts_file("notes/anything.xyz"));
    }

    #[test]
    fn snapshot_fills_missing_fields_on_read() {
        let config: IndexConfig = serde_json::from_str(r#"{"parallel": false}"#).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);

        let snapshot = IndexConfig::default().snapshot().unwrap();
        assert_eq!(snapshot["include_hidden"], serde_json::json!(false));
    }
}
