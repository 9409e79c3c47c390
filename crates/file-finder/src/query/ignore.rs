//! Ignore rules for folders (during traversal) and files (during search).

use std::collections::HashSet;
use std::path::{Component, Path};

use super::wildcard::WildcardPattern;

/// One comma-separated ignore list, compiled.
///
/// Entries without `*` are exact names, compared case-insensitively. Entries
/// with `*` are wildcard patterns evaluated against the lowercased name.
#[derive(Debug, Clone, Default)]
struct NameRules {
    exact: HashSet<String>,
    patterns: Vec<WildcardPattern>,
}

impl NameRules {
    fn parse(list: &str) -> Self {
        let mut rules = Self::default();
        for entry in list.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let entry = entry.to_lowercase();
            if entry.contains('*') {
                rules.patterns.push(WildcardPattern::new(&entry));
            } else {
                rules.exact.insert(entry);
            }
        }
        rules
    }

    fn matches_lower(&self, name_lower: &str) -> bool {
        self.exact.contains(name_lower)
            || self
                .patterns
                .iter()
                .any(|pattern| pattern.matches(name_lower))
    }

    fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }
}

/// Compiled ignore-folder and ignore-file-pattern configuration.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    folders: NameRules,
    files: NameRules,
}

impl IgnoreRules {
    /// Compiles the two comma-separated lists.
    pub fn new(ignore_folders: &str, ignore_file_patterns: &str) -> Self {
        Self {
            folders: NameRules::parse(ignore_folders),
            files: NameRules::parse(ignore_file_patterns),
        }
    }

    /// Returns true when a directory with this name must not be traversed.
    pub fn is_ignored_folder(&self, name: &str) -> bool {
        !self.folders.is_empty() && self.folders.matches_lower(&name.to_lowercase())
    }

    /// Returns true when a file must be dropped from search candidates.
    pub fn is_ignored_file(&self, file_name_lower: &str) -> bool {
        self.files.matches_lower(file_name_lower)
    }

    /// Returns true when any directory component of `path` below `root` is ignored.
    ///
    /// The final component is treated as a directory too: a change event for
    /// an ignored folder itself is as uninteresting as one inside it.
    pub fn is_ignored_path(&self, root: &Path, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        relative.components().any(|component| match component {
            Component::Normal(name) => self.is_ignored_folder(&name.to_string_lossy()),
            _ => false,
        })
    }
}
