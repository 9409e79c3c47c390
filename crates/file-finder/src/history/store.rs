//! Per-workspace selection counts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use fnv::FnvHashMap;
use parking_lot::RwLock;

use super::persistence::{history_file_name, read_history, write_history};
use crate::config::FinderConfig;
use crate::error::normalize_root;

#[derive(Debug, Default)]
struct HistoryState {
    root: Option<PathBuf>,
    counts: FnvHashMap<Box<str>, AtomicU32>,
}

/// Remembers how often each file was opened in the active workspace.
///
/// Incrementing a path that is already known only takes the shared lock; new
/// paths and trims take the exclusive one.
#[derive(Debug)]
pub struct HistoryStore {
    dir: Option<PathBuf>,
    cap: usize,
    state: RwLock<HistoryState>,
    dirty: AtomicBool,
    save_lane: tokio::sync::Mutex<()>,
}

impl HistoryStore {
    /// `dir` of `None` keeps history in memory only.
    pub fn new(dir: Option<PathBuf>, cap: usize) -> Self {
        Self {
            dir,
            cap: cap.max(2),
            state: RwLock::new(HistoryState::default()),
            dirty: AtomicBool::new(false),
            save_lane: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(config: &FinderConfig) -> Self {
        Self::new(config.history_dir(), config.history_cap())
    }

    pub fn active_root(&self) -> Option<PathBuf> {
        self.state.read().root.clone()
    }

    /// Switches to `root`, replacing in-memory counts with its persisted ones.
    /// Unsaved counts of the previous workspace are discarded.
    pub fn set_workspace_root(&self, root: &Path) {
        let root = normalize_root(root);
        if self.state.read().root.as_deref() == Some(root.as_path()) {
            return;
        }

        let mut counts = FnvHashMap::default();
        if let Some(path) = self.history_path(&root) {
            for (record_path, count) in read_history(&path) {
                counts
                    .entry(record_path)
                    .or_insert_with(|| AtomicU32::new(0))
                    .fetch_add(count, Ordering::Relaxed);
            }
        }
        log::debug!(
            "history workspace root={} entries={}",
            root.display(),
            counts.len()
        );

        let mut state = self.state.write();
        state.root = Some(root);
        state.counts = counts;
        self.dirty.store(false, Ordering::Release);
        self.trim_if_needed(&mut state);
    }

    /// Counts one more selection of `path` and returns the new count.
    pub fn record_selection(&self, path: &Path) -> u32 {
        let key = path.to_string_lossy();
        let count = {
            let state = self.state.read();
            state
                .counts
                .get(key.as_ref())
                .map(|count| count.fetch_add(1, Ordering::Relaxed).saturating_add(1))
        };

        let count = match count {
            Some(count) => count,
            None => {
                let mut state = self.state.write();
                let count = state
                    .counts
                    .entry(key.as_ref().into())
                    .or_insert_with(|| AtomicU32::new(0))
                    .fetch_add(1, Ordering::Relaxed)
                    .saturating_add(1);
                self.trim_if_needed(&mut state);
                count
            }
        };

        self.dirty.store(true, Ordering::Release);
        count
    }

    /// Number of recorded selections for `path`, 0 when unknown.
    pub fn selection_count(&self, path: &Path) -> u32 {
        self.state
            .read()
            .counts
            .get(path.to_string_lossy().as_ref())
            .map_or(0, |count| count.load(Ordering::Relaxed))
    }

    pub fn len(&self) -> usize {
        self.state.read().counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Copies the current counts for scoring many paths.
    ///
    /// The lock is released before this returns, so a long ranking pass never
    /// stalls `record_selection`.
    pub fn scores(&self) -> HistoryScores {
        let state = self.state.read();
        HistoryScores {
            counts: state
                .counts
                .iter()
                .map(|(path, count)| (path.clone(), count.load(Ordering::Relaxed)))
                .collect(),
        }
    }

    /// Persists the counts if anything changed since the last save.
    ///
    /// The write runs on the blocking pool. Failures are logged and dropped;
    /// history only biases ranking.
    pub async fn save(&self) {
        // Clear the flag and copy the counts inside the lane, so an older copy
        // can never be written after a newer one.
        let _lane = self.save_lane.lock().await;
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return;
        }

        let (root, mut records) = {
            let state = self.state.read();
            let Some(root) = state.root.clone() else {
                return;
            };
            let records: Vec<(Box<str>, u32)> = state
                .counts
                .iter()
                .map(|(path, count)| (path.clone(), count.load(Ordering::Relaxed)))
                .collect();
            (root, records)
        };
        let Some(path) = self.history_path(&root) else {
            return;
        };

        let entries = records.len();
        let target = path.clone();
        let written =
            tokio::task::spawn_blocking(move || write_history(&target, &mut records)).await;
        match written {
            Ok(Ok(())) => {
                log::debug!("history saved path={} entries={entries}", path.display())
            }
            Ok(Err(error)) => {
                log::warn!("history save failed path={}: {error}", path.display())
            }
            Err(error) => {
                log::warn!("history save task failed path={}: {error}", path.display())
            }
        }
    }

    fn history_path(&self, root: &Path) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(history_file_name(root)))
    }

    /// Keeps the `cap / 2` highest counts once the map grows past `cap`.
    fn trim_if_needed(&self, state: &mut HistoryState) {
        if state.counts.len() <= self.cap {
            return;
        }

        let before = state.counts.len();
        let mut ranked: Vec<(Box<str>, u32)> = state
            .counts
            .drain()
            .map(|(path, count)| (path, count.into_inner()))
            .collect();
        ranked.sort_unstable_by(|(a_path, a_count), (b_path, b_count)| {
            b_count.cmp(a_count).then_with(|| a_path.cmp(b_path))
        });
        ranked.truncate(self.cap / 2);
        state.counts = ranked
            .into_iter()
            .map(|(path, count)| (path, AtomicU32::new(count)))
            .collect();

        log::debug!("history trimmed from {before} to {} entries", state.counts.len());
    }
}

/// Point-in-time copy of the active counts.
#[derive(Debug, Default)]
pub struct HistoryScores {
    counts: FnvHashMap<Box<str>, u32>,
}

impl HistoryScores {
    pub fn score(&self, path: &Path) -> u32 {
        if self.counts.is_empty() {
            return 0;
        }
        self.counts
            .get(path.to_string_lossy().as_ref())
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
