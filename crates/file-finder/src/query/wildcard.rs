//! Segment-based `*` wildcard matching.

use memchr::memmem::Finder;

/// A `*` wildcard pattern compiled into literal segments.
///
/// The pattern is split once at construction. Matching walks the segments left
/// to right with forward-only substring search, so a match never backtracks and
/// never allocates.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    segments: Vec<Finder<'static>>,
    starts_with_wildcard: bool,
    ends_with_wildcard: bool,
    first_segment: Option<Box<str>>,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('*')
            .map(|segment| Finder::new(segment.as_bytes()).into_owned())
            .collect();
        let first_segment = pattern
            .split('*')
            .find(|segment| !segment.is_empty())
            .map(Into::into);

        Self {
            segments,
            starts_with_wildcard: pattern.starts_with('*'),
            ends_with_wildcard: pattern.ends_with('*'),
            first_segment,
        }
    }

    pub fn starts_with_wildcard(&self) -> bool {
        self.starts_with_wildcard
    }

    pub fn ends_with_wildcard(&self) -> bool {
        self.ends_with_wildcard
    }

    /// The first non-empty literal segment, used for the starts-with ranking signal.
    pub fn first_segment(&self) -> Option<&str> {
        self.first_segment.as_deref()
    }

    /// Returns true when the candidate begins with the first literal segment.
    pub fn first_segment_is_prefix_of(&self, candidate: &str) -> bool {
        self.first_segment
            .as_deref()
            .is_some_and(|segment| candidate.starts_with(segment))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let haystack = candidate.as_bytes();
        let last_index = self.segments.len().saturating_sub(1);
        let mut position = 0usize;

        for (index, finder) in self.segments.iter().enumerate() {
            let needle = finder.needle();
            if needle.is_empty() {
                continue;
            }

            let anchored_start = index == 0 && !self.starts_with_wildcard;
            let anchored_end = index == last_index && !self.ends_with_wildcard;

            if anchored_end {
                // The last segment must be a suffix that does not overlap earlier matches.
                if haystack.len() < position + needle.len() || !haystack.ends_with(needle) {
                    return false;
                }
                return !anchored_start || haystack.len() == needle.len();
            }

            if anchored_start {
                if !haystack.starts_with(needle) {
                    return false;
                }
                position = needle.len();
                continue;
            }

            match finder.find(&haystack[position..]) {
                Some(offset) => position += offset + needle.len(),
                None => return false,
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, candidate: &str) -> bool {
        WildcardPattern::new(pattern).matches(candidate)
    }

    #[test]
    fn leading_literal_is_anchored() {
        assert!(matches("test*.cs", "testfoo.cs"));
        assert!(!matches("test*.cs", "footest.cs"));
    }

    #[test]
    fn surrounding_wildcards_match_anywhere() {
        assert!(matches("*test*", "footestbar"));
        assert!(matches("*test*", "test"));
        assert!(!matches("*test*", "tes"));
    }

    #[test]
    fn suffix_pattern_matches_any_prefix() {
        for name in ["anything.cs", ".cs", "a.b.cs", "x.cs"] {
            assert!(matches("*.cs", name), "{name}");
        }
        assert!(!matches("*.cs", "file.csx"));
    }

    #[test]
    fn consecutive_wildcards_collapse() {
        assert!(matches("a**b", "a-b"));
        assert!(matches("**", ""));
        assert!(matches("*", "whatever"));
    }

    #[test]
    fn trailing_segment_does_not_overlap_previous_match() {
        assert!(!matches("ab*b", "ab"));
        assert!(matches("ab*b", "abb"));
        assert!(!matches("a*a", "a"));
    }

    #[test]
    fn middle_segments_are_found_in_order() {
        assert!(matches("*foo*bar*", "xfooybarz"));
        assert!(!matches("*foo*bar*", "xbaryfooz"));
    }

    #[test]
    fn pattern_without_wildcards_requires_equality() {
        assert!(matches("abc", "abc"));
        assert!(!matches("abc", "abcabc"));
        assert!(!matches("abc", "xabc"));
    }

    #[test]
    fn records_shape_of_pattern() {
        let pattern = WildcardPattern::new("**ser*vice");
        assert!(pattern.starts_with_wildcard());
        assert!(!pattern.ends_with_wildcard());
        assert_eq!(pattern.first_segment(), Some("ser"));
        assert!(pattern.first_segment_is_prefix_of("service.rs"));
        assert!(!pattern.first_segment_is_prefix_of("myservice.rs"));
    }
}
