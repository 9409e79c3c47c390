//! Bounded top-K selection and the ranking order.

use std::cmp::Ordering;

use crate::types::{FileEntry, SearchHit};

/// Keeps the `k` smallest items seen so far, in ascending order.
///
/// The backing `Vec` never holds more than `k + 1` items. Each push costs one
/// binary search plus a shift of at most `k` elements.
#[derive(Debug, Clone)]
pub struct TopK<T> {
    items: Vec<T>,
    k: usize,
}

impl<T: Ord> TopK<T> {
    pub fn new(k: usize) -> Self {
        Self {
            items: Vec::with_capacity(k.saturating_add(1).min(1024)),
            k,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Offers `item`. Returns false if it ranks outside the current top `k`.
    pub fn push(&mut self, item: T) -> bool {
        let at = self.items.partition_point(|kept| kept <= &item);
        if at >= self.k {
            return false;
        }
        self.items.insert(at, item);
        if self.items.len() > self.k {
            self.items.pop();
        }
        true
    }

    /// Folds another partial result in; used to combine per-thread selections.
    pub fn merge(mut self, other: Self) -> Self {
        for item in other.items {
            if !self.push(item) {
                // `other` is sorted, so nothing after this can fit either.
                break;
            }
        }
        self
    }

    pub fn into_sorted_vec(self) -> Vec<T> {
        self.items
    }
}

/// Returns the `k` smallest items in ascending order.
pub fn select_top_n<T: Ord>(items: impl IntoIterator<Item = T>, k: usize) -> Vec<T> {
    let mut top = TopK::new(k);
    for item in items {
        top.push(item);
    }
    top.into_sorted_vec()
}

/// Ranking key for a matched file. Orders best first.
///
/// Most significant first: history score (high first), code files, exact name
/// match, starts-with match, shorter names, then file name and full path.
#[derive(Debug, Clone, Copy)]
pub struct RankedCandidate<'a> {
    pub entry: &'a FileEntry,
    pub history_score: u32,
    pub is_code_file: bool,
    pub is_exact_match: bool,
    pub starts_with_query: bool,
}

impl RankedCandidate<'_> {
    pub fn to_hit(&self) -> SearchHit {
        hit_for(self.entry, self.history_score)
    }
}

impl Ord for RankedCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .history_score
            .cmp(&self.history_score)
            .then_with(|| other.is_code_file.cmp(&self.is_code_file))
            .then_with(|| other.is_exact_match.cmp(&self.is_exact_match))
            .then_with(|| other.starts_with_query.cmp(&self.starts_with_query))
            .then_with(|| {
                self.entry
                    .file_name()
                    .len()
                    .cmp(&other.entry.file_name().len())
            })
            .then_with(|| self.entry.file_name().cmp(other.entry.file_name()))
            .then_with(|| self.entry.full_path().cmp(other.entry.full_path()))
    }
}

impl PartialOrd for RankedCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedCandidate<'_> {}

/// History-browse key: score high first, then file name and full path.
#[derive(Debug, Clone, Copy)]
pub struct BrowseCandidate<'a> {
    pub entry: &'a FileEntry,
    pub history_score: u32,
}

impl BrowseCandidate<'_> {
    pub fn to_hit(&self) -> SearchHit {
        hit_for(self.entry, self.history_score)
    }
}

impl Ord for BrowseCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .history_score
            .cmp(&self.history_score)
            .then_with(|| self.entry.file_name().cmp(other.entry.file_name()))
            .then_with(|| self.entry.full_path().cmp(other.entry.full_path()))
    }
}

impl PartialOrd for BrowseCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BrowseCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BrowseCandidate<'_> {}

fn hit_for(entry: &FileEntry, history_score: u32) -> SearchHit {
    SearchHit {
        file_name: entry.file_name().to_string(),
        full_path: entry.full_path().to_path_buf(),
        relative_path: entry.relative_path().to_string(),
        history_score,
        icon: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    /// Deterministic pseudo-random sequence without pulling in a rng crate.
    fn scrambled(len: usize, seed: u64) -> Vec<u64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 33) % 97
            })
            .collect()
    }

    #[test]
    fn top_k_matches_full_sort_prefix() {
        for (len, k) in [(0, 3), (5, 10), (100, 1), (100, 7), (1000, 50), (64, 64)] {
            let values = scrambled(len, len as u64 + k as u64);
            let mut sorted = values.clone();
            sorted.sort();
            sorted.truncate(k);
            assert_eq!(select_top_n(values, k), sorted, "len={len} k={k}");
        }
    }

    #[test]
    fn zero_k_keeps_nothing() {
        let mut top = TopK::new(0);
        assert!(!top.push(1));
        assert!(top.is_empty());
    }

    #[test]
    fn merged_partials_equal_single_pass() {
        let values = scrambled(500, 42);
        let (left, right) = values.split_at(217);
        let merged = select_top_n(left.iter().copied(), 20);
        let merged = TopK {
            items: merged,
            k: 20,
        }
        .merge(TopK {
            items: select_top_n(right.iter().copied(), 20),
            k: 20,
        });
        assert_eq!(merged.into_sorted_vec(), select_top_n(values, 20));
    }

    fn entry(name: &str) -> FileEntry {
        FileEntry::new(name, PathBuf::from(format!("/r/{name}")), name)
    }

    fn candidate(entry: &FileEntry, score: u32, code: bool, exact: bool, starts: bool) -> RankedCandidate<'_> {
        RankedCandidate {
            entry,
            history_score: score,
            is_code_file: code,
            is_exact_match: exact,
            starts_with_query: starts,
        }
    }

    #[test]
    fn ranking_keys_apply_in_order() {
        let long = entry("a_very_long_name.png");
        let short = entry("b.rs");
        let mid = entry("ab.rs");

        let ranked = select_top_n(
            [
                candidate(&short, 0, true, false, true),
                candidate(&long, 3, false, false, false),
                candidate(&mid, 0, true, true, false),
                candidate(&short, 0, false, true, true),
            ],
            10,
        );
        let keys: Vec<_> = ranked
            .iter()
            .map(|c| (c.entry.file_name(), c.history_score, c.is_code_file, c.is_exact_match))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a_very_long_name.png", 3, false, false),
                ("ab.rs", 0, true, true),
                ("b.rs", 0, true, false),
                ("b.rs", 0, false, true),
            ]
        );
    }

    #[test]
    fn equal_signals_fall_back_to_length_then_name() {
        let names = ["zz.rs", "aaa.rs", "ab.rs", "aa.rs"];
        let entries: Vec<_> = names.iter().map(|name| entry(name)).collect();
        let ranked = select_top_n(
            entries.iter().map(|e| candidate(e, 0, true, false, false)),
            10,
        );
        let order: Vec<_> = ranked.iter().map(|c| c.entry.file_name()).collect();
        assert_eq!(order, vec!["aa.rs", "ab.rs", "zz.rs", "aaa.rs"]);
    }

    #[test]
    fn browse_orders_by_score_then_name() {
        let a = entry("a.rs");
        let b = entry("b.rs");
        let c = entry("c.rs");
        let ranked = select_top_n(
            [
                BrowseCandidate { entry: &c, history_score: 5 },
                BrowseCandidate { entry: &b, history_score: 1 },
                BrowseCandidate { entry: &a, history_score: 1 },
            ],
            2,
        );
        let order: Vec<_> = ranked.iter().map(|c| c.entry.file_name()).collect();
        assert_eq!(order, vec!["c.rs", "a.rs"]);
    }
}
