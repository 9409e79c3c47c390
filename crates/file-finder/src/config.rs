use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FinderError, Result};
use crate::query::IgnoreRules;

pub const DEFAULT_IGNORE_FOLDERS: &str = ".git,.vs,.idea,bin,obj,node_modules,packages,target";
pub const DEFAULT_IGNORE_FILE_PATTERNS: &str = "*.suo,*.user,*.pdb,*.dll,*.exe,*.cache";
pub const DEFAULT_HISTORY_CAP: usize = 500;
pub const DEFAULT_PARALLEL_MATCH_THRESHOLD: usize = 8192;

const HISTORY_DIR_NAME: &str = "file-finder";

/// Options for the indexer, history store and search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Comma-separated directory names (exact or `*` wildcard) skipped during traversal.
    pub ignore_folders: String,
    /// Comma-separated file names or `*` patterns dropped from search results.
    pub ignore_file_patterns: String,
    /// Maximum history entries per workspace before trimming to half.
    pub history_cap: usize,
    /// Where history files live. Defaults to the platform data directory.
    pub history_dir: Option<PathBuf>,
    /// Attach a filesystem watcher to each indexed root.
    pub watch: bool,
    /// Snapshots at least this large are matched on the rayon pool.
    pub parallel_match_threshold: usize,
    /// Worker threads per rescan. Defaults to the available parallelism.
    pub scan_threads: Option<usize>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            ignore_folders: DEFAULT_IGNORE_FOLDERS.to_string(),
            ignore_file_patterns: DEFAULT_IGNORE_FILE_PATTERNS.to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            history_dir: None,
            watch: true,
            parallel_match_threshold: DEFAULT_PARALLEL_MATCH_THRESHOLD,
            scan_threads: None,
        }
    }
}

impl FinderConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|error| {
            FinderError::Config(format!("failed to read config {}: {error}", path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|error| {
            FinderError::Config(format!("failed to parse config {}: {error}", path.display()))
        })
    }

    pub fn ignore_rules(&self) -> IgnoreRules {
        IgnoreRules::new(&self.ignore_folders, &self.ignore_file_patterns)
    }

    /// Resolved history directory, if one is configured or discoverable.
    pub fn history_dir(&self) -> Option<PathBuf> {
        self.history_dir.clone().or_else(|| {
            dirs::data_local_dir().map(|dir| dir.join(HISTORY_DIR_NAME).join("history"))
        })
    }

    pub fn scan_threads(&self) -> usize {
        self.scan_threads.filter(|threads| *threads > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|threads| threads.get())
                .unwrap_or(4)
        })
    }

    /// Minimum cap of 2 so that trimming to half keeps at least one entry.
    pub fn history_cap(&self) -> usize {
        self.history_cap.max(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("finder.json");
        std::fs::write(&path, r#"{ "ignore_folders": "dist", "watch": false }"#).unwrap();

        let config = FinderConfig::load(&path).expect("config");
        assert_eq!(config.ignore_folders, "dist");
        assert!(!config.watch);
        assert_eq!(config.history_cap, DEFAULT_HISTORY_CAP);
        assert_eq!(config.ignore_file_patterns, DEFAULT_IGNORE_FILE_PATTERNS);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("finder.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(FinderConfig::load(&path), Err(FinderError::Config(_))));
    }

    #[test]
    fn default_rules_skip_build_output() {
        let rules = FinderConfig::default().ignore_rules();
        assert!(rules.is_ignored_folder("node_modules"));
        assert!(rules.is_ignored_folder(".git"));
        assert!(rules.is_ignored_file("app.pdb"));
    }

    #[test]
    fn scan_threads_override() {
        let config = FinderConfig {
            scan_threads: Some(3),
            ..FinderConfig::default()
        };
        assert_eq!(config.scan_threads(), 3);
        assert!(FinderConfig::default().scan_threads() >= 1);
    }
}
