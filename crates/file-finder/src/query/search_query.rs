//! Structured query parsing: free text plus extension and path modifiers.

use std::collections::BTreeSet;

/// A parsed search query.
///
/// Modifier tokens are pulled out of the raw text once per search; whatever is
/// left becomes the free text that the name matcher works on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub free_text: String,
    pub include_extensions: BTreeSet<String>,
    pub exclude_extensions: BTreeSet<String>,
    pub path_filters: BTreeSet<String>,
    pub has_wildcard: bool,
}

impl SearchQuery {
    /// Parses a raw query.
    ///
    /// Tokens are classified in priority order:
    /// - `-.ext` excludes an extension
    /// - `\segment\` (or `/segment/`) requires a relative-path substring
    /// - `.ext` without `*` requires an extension
    /// - anything else is free text
    ///
    /// Everything is lowercased; matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::default();
        let mut free_text: Vec<String> = Vec::new();

        for token in raw.split_whitespace() {
            let token = token.to_lowercase();

            if let Some(extension) = token.strip_prefix('-').filter(|rest| is_extension(rest)) {
                query.exclude_extensions.insert(extension.to_string());
            } else if let Some(segment) = path_filter_segment(&token) {
                query.path_filters.insert(segment);
            } else if is_extension(&token) && !token.contains('*') {
                query.include_extensions.insert(token);
            } else {
                free_text.push(token);
            }
        }

        query.free_text = free_text.join(" ");
        query.has_wildcard = query.free_text.contains('*');
        query
    }

    pub fn has_filters(&self) -> bool {
        !self.include_extensions.is_empty()
            || !self.exclude_extensions.is_empty()
            || !self.path_filters.is_empty()
    }

    /// Checks the modifier filters against lowercased name and relative path.
    ///
    /// The relative path is expected to use `/` separators.
    pub fn passes_filters(&self, file_name_lower: &str, relative_path_lower: &str) -> bool {
        if !self.include_extensions.is_empty()
            && !self
                .include_extensions
                .iter()
                .any(|extension| file_name_lower.ends_with(extension.as_str()))
        {
            return false;
        }

        if self
            .exclude_extensions
            .iter()
            .any(|extension| file_name_lower.ends_with(extension.as_str()))
        {
            return false;
        }

        self.path_filters
            .iter()
            .all(|segment| relative_path_lower.contains(segment.as_str()))
    }
}

fn is_extension(token: &str) -> bool {
    token.len() > 1 && token.starts_with('.')
}

fn is_path_separator(ch: char) -> bool {
    ch == '\\' || ch == '/'
}

/// Returns the inner text of a separator-wrapped token, normalized to `/`.
fn path_filter_segment(token: &str) -> Option<String> {
    let mut chars = token.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    if !is_path_separator(first) || !is_path_separator(last) {
        return None;
    }

    let inner = token
        .trim_matches(is_path_separator)
        .replace('\\', "/");
    if inner.is_empty() {
        return None;
    }
    Some(inner)
}
