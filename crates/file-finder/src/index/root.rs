//! Shared per-root index state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use notify::RecommendedWatcher;

use super::state::{AtomicRootState, RootState, WatchMode};
use super::walk::ScanOutcome;
use crate::types::FileEntry;

/// An immutable listing of one root, as produced by a single rescan.
#[derive(Debug)]
pub struct IndexSnapshot {
    root: PathBuf,
    entries: Box<[FileEntry]>,
    scanned_dirs: usize,
    errors: usize,
    scan_duration: Duration,
}

impl IndexSnapshot {
    pub(crate) fn empty(root: PathBuf) -> Self {
        Self {
            root,
            entries: Box::default(),
            scanned_dirs: 0,
            errors: 0,
            scan_duration: Duration::ZERO,
        }
    }

    pub(crate) fn from_outcome(root: PathBuf, outcome: ScanOutcome, scan_duration: Duration) -> Self {
        Self {
            root,
            entries: outcome.entries.into_boxed_slice(),
            scanned_dirs: outcome.scanned_dirs,
            errors: outcome.errors,
            scan_duration,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files ordered by relative path.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scanned_dirs(&self) -> usize {
        self.scanned_dirs
    }

    /// Directories skipped because they could not be read.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn scan_duration(&self) -> Duration {
        self.scan_duration
    }
}

/// Cache slot for one normalized root.
pub(crate) struct RootIndex {
    pub root: PathBuf,
    pub state: AtomicRootState,
    /// Replaced wholesale by each rescan; readers never take a lock.
    pub snapshot: ArcSwapOption<IndexSnapshot>,
    /// Serializes rescans so concurrent stale searches share one scan.
    pub rescan_lane: tokio::sync::Mutex<()>,
    pub rescan_count: AtomicU64,
    pub watch_mode: AtomicU8,
    pub watcher: parking_lot::Mutex<Option<RecommendedWatcher>>,
    /// Set once the root is dropped from the cache; late watchers are discarded.
    pub retired: AtomicBool,
}

impl std::fmt::Debug for RootIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootIndex")
            .field("root", &self.root)
            .field("state", &self.state.load())
            .field("watch_mode", &self.watch_mode())
            .field("rescan_count", &self.rescan_count())
            .finish_non_exhaustive()
    }
}

impl RootIndex {
    pub fn new(root: PathBuf, watch_mode: WatchMode) -> Self {
        Self {
            root,
            state: AtomicRootState::default(),
            snapshot: ArcSwapOption::empty(),
            rescan_lane: tokio::sync::Mutex::new(()),
            rescan_count: AtomicU64::new(0),
            watch_mode: AtomicU8::new(watch_mode as u8),
            watcher: parking_lot::Mutex::new(None),
            retired: AtomicBool::new(false),
        }
    }

    /// Returns the snapshot only when no change has been seen since it was built.
    pub fn fresh_snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        if self.state.load() != RootState::Clean {
            return None;
        }
        self.snapshot.load_full()
    }

    pub fn mark_dirty(&self) {
        self.state.mark_dirty();
    }

    pub fn watch_mode(&self) -> WatchMode {
        WatchMode::load(&self.watch_mode)
    }

    pub fn set_watch_mode(&self, mode: WatchMode) {
        self.watch_mode.store(mode as u8, Ordering::Release);
    }

    pub fn rescan_count(&self) -> u64 {
        self.rescan_count.load(Ordering::Relaxed)
    }

    /// Detaches the watcher and marks the slot as no longer cached.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
        self.watcher.lock().take();
    }
}
