//! SearchEngine - answers one query against the cached index of a root.

use std::path::Path;
use std::sync::Arc;

use memchr::memmem::Finder;
use rayon::prelude::*;

use super::rank::{BrowseCandidate, RankedCandidate, TopK};
use crate::cancel::{CancellationToken, SearchVersionTracker};
use crate::config::FinderConfig;
use crate::error::{join_error, Result};
use crate::history::{HistoryScores, HistoryStore};
use crate::index::{IndexSnapshot, Indexer};
use crate::query::{extension_of_name, is_code_file, IgnoreRules, SearchQuery, WildcardPattern};
use crate::types::{FileEntry, SearchHit, SearchResults};

/// Resolves a display icon for a file name.
///
/// Only called for the final, capped hit list.
pub trait IconResolver: Send + Sync {
    fn icon_for(&self, file_name: &str) -> Option<String>;
}

/// How the free text is matched against lowercase file names.
#[derive(Debug)]
enum NameMatcher {
    /// Empty free text: every name matches and every name "starts with" it.
    Any,
    Substring { text: Box<str>, finder: Finder<'static> },
    Wildcard(WildcardPattern),
}

impl NameMatcher {
    fn new(query: &SearchQuery) -> Self {
        if query.free_text.is_empty() {
            Self::Any
        } else if query.has_wildcard {
            Self::Wildcard(WildcardPattern::new(&query.free_text))
        } else {
            Self::Substring {
                finder: Finder::new(query.free_text.as_bytes()).into_owned(),
                text: query.free_text.as_str().into(),
            }
        }
    }

    fn matches(&self, name_lower: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Substring { finder, .. } => finder.find(name_lower.as_bytes()).is_some(),
            Self::Wildcard(pattern) => pattern.matches(name_lower),
        }
    }

    fn starts_with(&self, name_lower: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Substring { text, .. } => name_lower.starts_with(text.as_ref()),
            Self::Wildcard(pattern) => pattern.first_segment_is_prefix_of(name_lower),
        }
    }
}

/// Everything needed to evaluate one query against a snapshot.
#[derive(Debug)]
struct QueryPlan {
    query: SearchQuery,
    matcher: NameMatcher,
    rules: Arc<IgnoreRules>,
    max_results: usize,
}

/// Matched-and-ranked partial result for a slice of the snapshot.
struct Partial<'a> {
    top: TopK<RankedCandidate<'a>>,
    matched: usize,
}

impl<'a> Partial<'a> {
    fn new(k: usize) -> Self {
        Self {
            top: TopK::new(k),
            matched: 0,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            top: self.top.merge(other.top),
            matched: self.matched + other.matched,
        }
    }

    fn offer(&mut self, candidate: Option<RankedCandidate<'a>>) {
        if let Some(candidate) = candidate {
            self.matched += 1;
            self.top.push(candidate);
        }
    }
}

/// Ranked hits plus counters, before icon decoration.
struct Ranked {
    hits: Vec<SearchHit>,
    matched: usize,
}

impl QueryPlan {
    fn new(raw_query: &str, rules: Arc<IgnoreRules>, max_results: usize) -> Self {
        let query = SearchQuery::parse(raw_query);
        let matcher = NameMatcher::new(&query);
        Self {
            query,
            matcher,
            rules,
            max_results,
        }
    }

    fn candidate<'a>(
        &self,
        entry: &'a FileEntry,
        scores: &HistoryScores,
    ) -> Option<RankedCandidate<'a>> {
        let name = entry.file_name_lower();
        if !self.matcher.matches(name) || self.rules.is_ignored_file(name) {
            return None;
        }
        if self.query.has_filters()
            && !self.query.passes_filters(name, entry.relative_path_lower())
        {
            return None;
        }

        Some(RankedCandidate {
            entry,
            history_score: scores.score(entry.full_path()),
            is_code_file: is_code_file(name),
            is_exact_match: self.is_exact_match(name),
            starts_with_query: self.matcher.starts_with(name),
        })
    }

    /// Name equals the free text, with or without its extension.
    fn is_exact_match(&self, name_lower: &str) -> bool {
        let text = self.query.free_text.as_str();
        if text.is_empty() {
            return false;
        }
        if name_lower == text {
            return true;
        }
        extension_of_name(name_lower).is_some_and(|extension| {
            let stem = &name_lower[..name_lower.len() - extension.len() - 1];
            stem == text
        })
    }

    fn rank_sequential(
        &self,
        entries: &[FileEntry],
        scores: &HistoryScores,
        cancel: &CancellationToken,
    ) -> Option<Ranked> {
        let mut partial = Partial::new(self.max_results);
        for (i, entry) in entries.iter().enumerate() {
            cancel.is_cancelled_sparse(i)?;
            partial.offer(self.candidate(entry, scores));
        }
        Some(self.finish(partial))
    }

    fn rank_parallel(
        &self,
        entries: &[FileEntry],
        scores: &HistoryScores,
        cancel: &CancellationToken,
    ) -> Option<Ranked> {
        let partial = entries
            .par_iter()
            .enumerate()
            .try_fold(
                || Partial::new(self.max_results),
                |mut partial, (i, entry)| {
                    cancel.is_cancelled_sparse(i)?;
                    partial.offer(self.candidate(entry, scores));
                    Some(partial)
                },
            )
            .try_reduce(|| Partial::new(self.max_results), |a, b| Some(a.merge(b)))?;
        Some(self.finish(partial))
    }

    fn finish(&self, partial: Partial<'_>) -> Ranked {
        Ranked {
            matched: partial.matched,
            hits: partial
                .top
                .into_sorted_vec()
                .iter()
                .map(RankedCandidate::to_hit)
                .collect(),
        }
    }
}

/// Files opened before, ranked purely by how often.
fn browse_history(
    entries: &[FileEntry],
    rules: &IgnoreRules,
    history: &HistoryStore,
    max_results: usize,
    cancel: &CancellationToken,
) -> Option<Ranked> {
    let scores = history.scores();
    if scores.is_empty() {
        return Some(Ranked {
            hits: Vec::new(),
            matched: 0,
        });
    }

    let mut top = TopK::new(max_results);
    let mut matched = 0;
    for (i, entry) in entries.iter().enumerate() {
        cancel.is_cancelled_sparse(i)?;
        let history_score = scores.score(entry.full_path());
        if history_score == 0 || rules.is_ignored_file(entry.file_name_lower()) {
            continue;
        }
        matched += 1;
        top.push(BrowseCandidate {
            entry,
            history_score,
        });
    }

    Some(Ranked {
        hits: top
            .into_sorted_vec()
            .iter()
            .map(BrowseCandidate::to_hit)
            .collect(),
        matched,
    })
}

/// Orchestrates the indexer, query matching, history and ranking.
pub struct SearchEngine {
    indexer: Arc<Indexer>,
    history: Arc<HistoryStore>,
    icons: Option<Arc<dyn IconResolver>>,
    versions: SearchVersionTracker,
    parallel_threshold: usize,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("indexer", &self.indexer)
            .field("history", &self.history)
            .field("icons", &self.icons.as_ref().map(|_| "<resolver>"))
            .field("parallel_threshold", &self.parallel_threshold)
            .finish()
    }
}

impl SearchEngine {
    pub fn new(config: &FinderConfig) -> Self {
        Self::with_parts(
            Arc::new(Indexer::new(config)),
            Arc::new(HistoryStore::from_config(config)),
            config.parallel_match_threshold,
        )
    }

    pub fn with_parts(
        indexer: Arc<Indexer>,
        history: Arc<HistoryStore>,
        parallel_threshold: usize,
    ) -> Self {
        Self {
            indexer,
            history,
            icons: None,
            versions: SearchVersionTracker::new(),
            parallel_threshold: parallel_threshold.max(1),
        }
    }

    pub fn with_icon_resolver(mut self, resolver: Arc<dyn IconResolver>) -> Self {
        self.icons = Some(resolver);
        self
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Token for a new search. Every token handed out earlier is cancelled.
    pub fn next_search_token(&self) -> CancellationToken {
        self.versions.next_token()
    }

    /// Runs one query against `root`.
    ///
    /// Returns `Ok(None)` when `cancel` fires; a cancelled search never yields
    /// a partial list.
    pub async fn search(
        &self,
        root: &Path,
        raw_query: &str,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<SearchResults>> {
        if root.as_os_str().is_empty() || max_results == 0 {
            return Ok(Some(SearchResults::empty(raw_query, root.to_path_buf())));
        }

        if cancel.is_cancelled().is_none() {
            return Ok(None);
        }
        let Some(snapshot) = self.indexer.index(root, cancel).await? else {
            return Ok(None);
        };

        if cancel.is_cancelled().is_none() {
            return Ok(None);
        }
        let ranked = if raw_query.trim().is_empty() {
            browse_history(
                snapshot.entries(),
                self.indexer.rules(),
                &self.history,
                max_results,
                cancel,
            )
        } else {
            let plan = QueryPlan::new(raw_query, self.indexer.rules().clone(), max_results);
            if snapshot.len() >= self.parallel_threshold {
                self.rank_on_pool(plan, snapshot.clone(), cancel).await?
            } else {
                let scores = self.history.scores();
                plan.rank_sequential(snapshot.entries(), &scores, cancel)
            }
        };
        let Some(Ranked { mut hits, matched }) = ranked else {
            return Ok(None);
        };

        if cancel.is_cancelled().is_none() {
            return Ok(None);
        }
        if let Some(icons) = &self.icons {
            for hit in &mut hits {
                hit.icon = icons.icon_for(&hit.file_name);
            }
        }

        log::debug!(
            "file search root={} query={:?} scanned={} matched={} returned={}",
            snapshot.root().display(),
            raw_query,
            snapshot.len(),
            matched,
            hits.len()
        );

        Ok(Some(SearchResults {
            query: raw_query.to_string(),
            root: snapshot.root().to_path_buf(),
            hits,
            matched,
            scanned: snapshot.len(),
        }))
    }

    /// Matches a large snapshot on the rayon pool without blocking the runtime.
    async fn rank_on_pool(
        &self,
        plan: QueryPlan,
        snapshot: Arc<IndexSnapshot>,
        cancel: &CancellationToken,
    ) -> Result<Option<Ranked>> {
        let history = self.history.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let scores = history.scores();
            plan.rank_parallel(snapshot.entries(), &scores, &cancel)
        })
        .await
        .map_err(|error| join_error("file search", error))
    }

    /// Records that the user opened `path` and persists history.
    pub async fn record_selection(&self, path: &Path) {
        self.history.record_selection(path);
        self.history.save().await;
    }

    /// Switches the history workspace, saving the previous one first.
    pub async fn set_workspace_root(&self, root: &Path) {
        self.history.save().await;
        self.history.set_workspace_root(root);
    }
}
