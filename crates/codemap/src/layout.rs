//! On-disk layout of an index.
//!
//! ```text
//! <root>/
//! ├── .codemap/
//! │   ├── .codemap.json            root manifest + root-level file entries
//! │   ├── src/
//! │   │   ├── .codemap.json        directory map for src/
//! │   │   └── components/
//! │   │       └── .codemap.json    directory map for src/components/
//! │   └── tests/
//! │       └── .codemap.json
//! ├── src/...
//! └── tests/...
//! ```
//!
//! Every relative path handled here uses forward slashes, regardless of
//! platform. The root directory is the empty string.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Name of the hidden index directory created under the indexed root.
pub const INDEX_DIR: &str = ".codemap";

/// File name of the manifest and of every directory map.
pub const MAP_FILENAME: &str = ".codemap.json";

/// Maps relative source paths to storage locations under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    root: PathBuf,
    index_root: PathBuf,
}

impl IndexLayout {
    /// Creates the layout for `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let index_root = root.join(INDEX_DIR);
        Self { root, index_root }
    }

    /// The indexed root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The hidden index directory.
    #[must_use]
    pub fn index_root(&self) -> &Path {
        &self.index_root
    }

    /// Location of the root manifest.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.index_root.join(MAP_FILENAME)
    }

    /// Mirror directory for `directory` under the index root.
    #[must_use]
    pub fn map_dir(&self, directory: &str) -> PathBuf {
        directory
            .split('/')
            .filter(|c| !c.is_empty())
            .fold(self.index_root.clone(), |path, component| path.join(component))
    }

    /// Location of the directory map for `directory`.
    ///
    /// For the root directory this is the manifest itself.
    #[must_use]
    pub fn map_path(&self, directory: &str) -> PathBuf {
        self.map_dir(directory).join(MAP_FILENAME)
    }

    /// Inverse of [`map_path`](Self::map_path) for map files found on disk.
    ///
    /// Returns `None` for the manifest and for paths outside the index root.
    #[must_use]
    pub fn directory_for_map(&self, map_path: &Path) -> Option<String> {
        if map_path.file_name()? != MAP_FILENAME {
            return None;
        }
        let relative = map_path.parent()?.strip_prefix(&self.index_root).ok()?;
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if components.is_empty() {
            None
        } else {
            Some(components.join("/"))
        }
    }
}

/// A relative file path split into its directory and file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelPath {
    /// Containing directory, `""` for the root.
    pub directory: String,
    /// Basename.
    pub file_name: String,
}

impl RelPath {
    /// Parses and normalizes a relative path.
    ///
    /// Backslashes are treated as separators and `.` components are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for empty or absolute paths, paths with
    /// `..` components, and paths using the map file name as a component.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidPath {
            path: raw.to_string(),
            reason,
        };

        let normalized = raw.replace('\\', "/");
        if normalized.starts_with('/') || has_drive_prefix(&normalized) {
            return Err(invalid("path must be relative to the indexed root"));
        }

        let mut components = Vec::new();
        for component in normalized.split('/') {
            match component {
                "" | "." => {}
                ".." => return Err(invalid("path must not contain '..'")),
                MAP_FILENAME => return Err(invalid("path collides with the index file name")),
                other => components.push(other),
            }
        }

        let Some(file_name) = components.pop() else {
            return Err(invalid("path is empty"));
        };

        Ok(Self {
            directory: components.join("/"),
            file_name: file_name.to_string(),
        })
    }

    /// Joins the parts back into a normalized relative path.
    #[must_use]
    pub fn to_path_string(&self) -> String {
        join(&self.directory, &self.file_name)
    }
}

/// Joins a directory and a basename into a relative path.
#[must_use]
pub fn join(directory: &str, file_name: &str) -> String {
    if directory.is_empty() {
        file_name.to_string()
    } else {
        format!("{directory}/{file_name}")
    }
}

/// Parent of a non-root directory, `None` when the parent is the root.
#[must_use]
pub fn parent_dir(directory: &str) -> Option<&str> {
    directory.rsplit_once('/').map(|(parent, _)| parent)
}

/// `directory` followed by each of its ancestors, excluding the root.
///
/// `"a/b/c"` yields `"a/b/c"`, `"a/b"`, `"a"`.
pub fn ancestors(directory: &str) -> impl Iterator<Item = &str> {
    let first = (!directory.is_empty()).then_some(directory);
    std::iter::successors(first, |dir| parent_dir(dir))
}

/// Returns `true` if `candidate` is strictly below `directory`.
#[must_use]
pub fn is_descendant(candidate: &str, directory: &str) -> bool {
    candidate.len() > directory.len()
        && candidate.starts_with(directory)
        && candidate.as_bytes()[directory.len()] == b'/'
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::root_file("main.py", "", "main.py")]
    #[case::nested("src/components/Button.py", "src/components", "Button.py")]
    #[case::backslashes("src\\utils\\helper.py", "src/utils", "helper.py")]
    #[case::dot_components("./src/./app.py", "src", "app.py")]
    #[case::doubled_separators("src//app.py", "src", "app.py")]
    fn parse_splits_directory_and_name(
        #[case] raw: &str,
        #[case] directory: &str,
        #[case] file_name: &str,
    ) {
        let rel = RelPath::parse(raw).unwrap();
        assert_eq!(rel.directory, directory);
        assert_eq!(rel.file_name, file_name);
    }

    #[rstest]
    #[case::empty("")]
    #[case::only_dots("./.")]
    #[case::absolute("/etc/passwd")]
    #[case::drive("C:/code/app.py")]
    #[case::parent("../outside.py")]
    #[case::inner_parent("src/../../outside.py")]
    #[case::map_name("src/.codemap.json")]
    fn parse_rejects_invalid_paths(#[case] raw: &str) {
        assert!(matches!(RelPath::parse(raw), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn map_paths_mirror_directories() {
        let layout = IndexLayout::new("/work/project");

        assert_eq!(
            layout.manifest_path(),
            Path::new("/work/project/.codemap/.codemap.json")
        );
        assert_eq!(layout.map_path(""), layout.manifest_path());
        assert_eq!(
            layout.map_path("src/components"),
            Path::new("/work/project/.codemap/src/components/.codemap.json")
        );
    }

    #[test]
    fn directory_for_map_inverts_map_path() {
        let layout = IndexLayout::new("/work/project");

        let path = layout.map_path("src/components");
        assert_eq!(layout.directory_for_map(&path).as_deref(), Some("src/components"));
        assert_eq!(layout.directory_for_map(&layout.manifest_path()), None);
        assert_eq!(
            layout.directory_for_map(Path::new("/elsewhere/.codemap.json")),
            None
        );
    }

    #[test]
    fn ancestors_exclude_root() {
        let all: Vec<&str> = ancestors("a/b/c").collect();
        assert_eq!(all, ["a/b/c", "a/b", "a"]);
        assert_eq!(ancestors("").count(), 0);
    }

    #[test]
    fn descendant_check_respects_component_boundaries() {
        assert!(is_descendant("src/utils", "src"));
        assert!(!is_descendant("srcs/utils", "src"));
        assert!(!is_descendant("src", "src"));
    }
}
