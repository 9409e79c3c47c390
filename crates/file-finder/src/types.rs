//! Core record and result types shared by the indexer and the search engine.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;

use crate::index::{RootState, WatchMode};

/// One indexed file.
///
/// Entries are immutable once built by a rescan. The lowercase projections are
/// computed on first access and cached next to their source fields.
#[derive(Debug)]
pub struct FileEntry {
    file_name: Box<str>,
    full_path: PathBuf,
    relative_path: Box<str>,
    file_name_lower: OnceLock<Box<str>>,
    relative_path_lower: OnceLock<Box<str>>,
}

impl FileEntry {
    pub fn new(
        file_name: impl Into<Box<str>>,
        full_path: PathBuf,
        relative_path: impl Into<Box<str>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            full_path,
            relative_path: relative_path.into(),
            file_name_lower: OnceLock::new(),
            relative_path_lower: OnceLock::new(),
        }
    }

    /// Builds an entry for `full_path`, deriving the name and the path relative to `root`.
    pub fn from_paths(root: &Path, full_path: PathBuf) -> Option<Self> {
        let file_name = full_path.file_name()?.to_string_lossy().into_owned();
        let relative_path = full_path
            .strip_prefix(root)
            .ok()?
            .to_string_lossy()
            .into_owned();
        Some(Self::new(file_name, full_path, relative_path))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn file_name_lower(&self) -> &str {
        self.file_name_lower
            .get_or_init(|| self.file_name.to_lowercase().into_boxed_str())
    }

    /// Lowercased relative path with `/` separators on every platform.
    pub fn relative_path_lower(&self) -> &str {
        self.relative_path_lower.get_or_init(|| {
            self.relative_path
                .to_lowercase()
                .replace('\\', "/")
                .into_boxed_str()
        })
    }
}

/// A ranked search hit, decorated for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub file_name: String,
    pub full_path: PathBuf,
    pub relative_path: String,
    pub history_score: u32,
    /// Display icon identifier from the host's resolver, if one is installed.
    pub icon: Option<String>,
}

/// Results of one search call.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// The raw query that was executed.
    pub query: String,
    /// The normalized root that was searched.
    pub root: PathBuf,
    /// Ranked hits, best first, never longer than the requested cap.
    pub hits: Vec<SearchHit>,
    /// Number of entries that passed matching and filters before the cap.
    pub matched: usize,
    /// Number of index entries examined.
    pub scanned: usize,
}

impl SearchResults {
    pub fn empty(query: &str, root: PathBuf) -> Self {
        Self {
            query: query.to_string(),
            root,
            hits: Vec::new(),
            matched: 0,
            scanned: 0,
        }
    }

    /// File names of the hits, in rank order.
    pub fn file_names(&self) -> Vec<&str> {
        self.hits.iter().map(|hit| hit.file_name.as_str()).collect()
    }
}

/// Point-in-time view of one cached root.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub root: PathBuf,
    pub state: RootState,
    pub watch_mode: WatchMode,
    /// Files in the current snapshot; zero before the first rescan completes.
    pub entries: usize,
    pub errors: usize,
    pub rescan_count: u64,
    pub last_rescan_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_paths_derives_name_and_relative_path() {
        let root = Path::new("/work/repo");
        let entry = FileEntry::from_paths(root, root.join("src").join("Main.RS")).unwrap();
        assert_eq!(entry.file_name(), "Main.RS");
        assert_eq!(entry.relative_path(), Path::new("src").join("Main.RS").to_string_lossy());
        assert_eq!(entry.file_name_lower(), "main.rs");
        assert_eq!(entry.relative_path_lower(), "src/main.rs");
    }

    #[test]
    fn from_paths_rejects_paths_outside_root() {
        assert!(FileEntry::from_paths(Path::new("/work/repo"), PathBuf::from("/etc/hosts")).is_none());
    }

    #[test]
    fn lowercase_projection_normalizes_backslashes() {
        let entry = FileEntry::new("A.cs", PathBuf::from("C:/r/Src/A.cs"), "Src\\A.cs");
        assert_eq!(entry.relative_path_lower(), "src/a.cs");
    }
}
