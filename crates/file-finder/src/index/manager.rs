//! Indexer - per-root snapshot cache with lazy rescans.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use fnv::FnvHashMap;
use parking_lot::RwLock;

use super::root::{IndexSnapshot, RootIndex};
use super::state::WatchMode;
use super::walk::scan_root;
use super::watcher::{path_affects_root, spawn_watcher_attach};
use crate::cancel::CancellationToken;
use crate::config::FinderConfig;
use crate::error::{join_error, normalize_root, Result};
use crate::query::IgnoreRules;
use crate::types::IndexStatus;

/// Builds and caches one snapshot per root.
///
/// Change events only mark a root dirty. The next [`Indexer::index`] call for
/// that root pays for a single rescan; concurrent callers wait on it and share
/// the result.
#[derive(Debug)]
pub struct Indexer {
    rules: Arc<IgnoreRules>,
    watch: bool,
    scan_threads: usize,
    roots: RwLock<FnvHashMap<PathBuf, Arc<RootIndex>>>,
}

impl Indexer {
    pub fn new(config: &FinderConfig) -> Self {
        Self::with_rules(config.ignore_rules(), config.watch, config.scan_threads())
    }

    pub fn with_rules(rules: IgnoreRules, watch: bool, scan_threads: usize) -> Self {
        Self {
            rules: Arc::new(rules),
            watch,
            scan_threads: scan_threads.max(1),
            roots: RwLock::new(FnvHashMap::default()),
        }
    }

    pub fn rules(&self) -> &Arc<IgnoreRules> {
        &self.rules
    }

    /// Returns the snapshot for `root`, rescanning first if it is not clean.
    ///
    /// A root that does not exist (or is not a directory) yields an empty
    /// snapshot and is not cached. Returns `Ok(None)` when `cancel` fires before
    /// a fresh snapshot is available.
    pub async fn index(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<IndexSnapshot>>> {
        let root = normalize_root(root);
        if !root.is_dir() {
            log::debug!("file index root missing root={}", root.display());
            return Ok(Some(Arc::new(IndexSnapshot::empty(root))));
        }

        let index = self.root_index(&root);
        if let Some(snapshot) = index.fresh_snapshot() {
            return Ok(Some(snapshot));
        }
        if cancel.is_cancelled().is_none() {
            return Ok(None);
        }

        let _lane = index.rescan_lane.lock().await;
        // Another caller may have finished the rescan while we waited.
        if let Some(snapshot) = index.fresh_snapshot() {
            return Ok(Some(snapshot));
        }
        if cancel.is_cancelled().is_none() {
            return Ok(None);
        }

        self.rescan(&index, cancel).await
    }

    /// Marks `root` dirty and rescans it now.
    ///
    /// This is the manual refresh action for roots whose watch mode is static
    /// or disabled.
    pub async fn refresh(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<IndexSnapshot>>> {
        self.mark_dirty(root);
        self.index(root, cancel).await
    }

    async fn rescan(
        &self,
        index: &Arc<RootIndex>,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<IndexSnapshot>>> {
        index.state.begin_rescan();
        let started = Instant::now();

        let root = index.root.clone();
        let rules = self.rules.clone();
        let threads = self.scan_threads;
        let scan_cancel = cancel.clone();
        let scanned = tokio::task::spawn_blocking(move || {
            scan_root(&root, &rules, threads, &scan_cancel)
        })
        .await;

        let outcome = match scanned {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                index.state.abort_rescan();
                log::debug!("file index rescan cancelled root={}", index.root.display());
                return Ok(None);
            }
            Err(error) => {
                index.state.abort_rescan();
                return Err(join_error("file index rescan", error));
            }
        };

        let elapsed = started.elapsed();
        let snapshot = Arc::new(IndexSnapshot::from_outcome(
            index.root.clone(),
            outcome,
            elapsed,
        ));
        index.snapshot.store(Some(snapshot.clone()));
        index.rescan_count.fetch_add(1, Ordering::Relaxed);
        let clean = index.state.finish_rescan();

        log::info!(
            "file index rescan root={} entries={} dirs={} errors={} elapsed_ms={} clean={}",
            index.root.display(),
            snapshot.len(),
            snapshot.scanned_dirs(),
            snapshot.errors(),
            elapsed.as_millis(),
            clean,
        );

        Ok(Some(snapshot))
    }

    /// Drops the cached snapshot and watcher for `root`.
    ///
    /// Returns true if the root was cached.
    pub fn invalidate(&self, root: &Path) -> bool {
        let root = normalize_root(root);
        let Some(index) = self.roots.write().remove(&root) else {
            return false;
        };
        index.retire();
        log::debug!("file index invalidated root={}", root.display());
        true
    }

    pub fn invalidate_all(&self) {
        let drained: Vec<_> = self.roots.write().drain().collect();
        for (_, index) in &drained {
            index.retire();
        }
        log::debug!("file index invalidated {} roots", drained.len());
    }

    /// Flags `root` so the next search rescans it. Returns false if not cached.
    pub fn mark_dirty(&self, root: &Path) -> bool {
        match self.cached(root) {
            Some(index) => {
                index.mark_dirty();
                true
            }
            None => false,
        }
    }

    /// Feeds one externally observed change. Paths inside ignored folders or
    /// outside the root are dropped.
    pub fn notify_path_changed(&self, root: &Path, path: &Path) -> bool {
        let Some(index) = self.cached(root) else {
            return false;
        };
        if !path_affects_root(&self.rules, &index.root, path) {
            return false;
        }
        index.mark_dirty();
        true
    }

    pub fn status(&self, root: &Path) -> Option<IndexStatus> {
        let index = self.cached(root)?;
        let snapshot = index.snapshot.load_full();
        Some(IndexStatus {
            root: index.root.clone(),
            state: index.state.load(),
            watch_mode: index.watch_mode(),
            entries: snapshot.as_ref().map_or(0, |snapshot| snapshot.len()),
            errors: snapshot.as_ref().map_or(0, |snapshot| snapshot.errors()),
            rescan_count: index.rescan_count(),
            last_rescan_ms: snapshot
                .as_ref()
                .map(|snapshot| snapshot.scan_duration().as_millis() as u64),
        })
    }

    fn cached(&self, root: &Path) -> Option<Arc<RootIndex>> {
        let root = normalize_root(root);
        self.roots.read().get(&root).cloned()
    }

    fn root_index(&self, root: &Path) -> Arc<RootIndex> {
        if let Some(index) = self.roots.read().get(root) {
            return index.clone();
        }

        let mut roots = self.roots.write();
        if let Some(index) = roots.get(root) {
            return index.clone();
        }

        let mode = if self.watch {
            WatchMode::Pending
        } else {
            WatchMode::Disabled
        };
        let index = Arc::new(RootIndex::new(root.to_path_buf(), mode));
        roots.insert(root.to_path_buf(), index.clone());
        drop(roots);

        if self.watch {
            spawn_watcher_attach(index.clone(), self.rules.clone());
        }
        log::info!(
            "file index init root={} watch_mode={}",
            root.display(),
            mode.as_str()
        );
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RootState;
    use pretty_assertions::assert_eq;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn indexer(watch: bool) -> Indexer {
        Indexer::with_rules(IgnoreRules::new("bin,obj", "*.pdb"), watch, 2)
    }

    fn names(snapshot: &IndexSnapshot) -> Vec<&str> {
        snapshot.entries().iter().map(|entry| entry.file_name()).collect()
    }

    #[tokio::test]
    async fn clean_root_reuses_snapshot() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.rs")).unwrap();
        let indexer = indexer(false);
        let cancel = CancellationToken::noop();

        let first = indexer.index(temp.path(), &cancel).await.unwrap().unwrap();
        let second = indexer.index(temp.path(), &cancel).await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let status = indexer.status(temp.path()).unwrap();
        assert_eq!(status.rescan_count, 1);
        assert_eq!(status.state, RootState::Clean);
        assert_eq!(status.watch_mode, WatchMode::Disabled);
    }

    #[tokio::test]
    async fn dirty_root_rescans_once() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.rs")).unwrap();
        let indexer = indexer(false);
        let cancel = CancellationToken::noop();

        indexer.index(temp.path(), &cancel).await.unwrap();
        File::create(temp.path().join("b.rs")).unwrap();
        assert!(indexer.mark_dirty(temp.path()));

        let snapshot = indexer.index(temp.path(), &cancel).await.unwrap().unwrap();
        assert_eq!(names(&snapshot), vec!["a.rs", "b.rs"]);
        indexer.index(temp.path(), &cancel).await.unwrap();
        assert_eq!(indexer.status(temp.path()).unwrap().rescan_count, 2);
    }

    #[tokio::test]
    async fn concurrent_stale_searches_share_one_rescan() {
        let temp = TempDir::new().unwrap();
        for i in 0..50 {
            File::create(temp.path().join(format!("f{i}.txt"))).unwrap();
        }
        let indexer = Arc::new(indexer(false));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let indexer = indexer.clone();
                let root = temp.path().to_path_buf();
                tokio::spawn(async move {
                    indexer
                        .index(&root, &CancellationToken::noop())
                        .await
                        .unwrap()
                        .unwrap()
                        .len()
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), 50);
        }
        assert_eq!(indexer.status(temp.path()).unwrap().rescan_count, 1);
    }

    #[tokio::test]
    async fn missing_root_yields_empty_snapshot() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");
        let indexer = indexer(false);

        let snapshot = indexer
            .index(&missing, &CancellationToken::noop())
            .await
            .unwrap()
            .unwrap();
        assert!(snapshot.is_empty());
        assert!(indexer.status(&missing).is_none());
    }

    #[tokio::test]
    async fn invalidate_forgets_root() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.rs")).unwrap();
        let indexer = indexer(false);

        indexer.index(temp.path(), &CancellationToken::noop()).await.unwrap();
        assert!(indexer.invalidate(temp.path()));
        assert!(!indexer.invalidate(temp.path()));
        assert!(indexer.status(temp.path()).is_none());

        indexer.index(temp.path(), &CancellationToken::noop()).await.unwrap();
        assert_eq!(indexer.status(temp.path()).unwrap().rescan_count, 1);

        indexer.invalidate_all();
        assert!(indexer.status(temp.path()).is_none());
    }

    #[tokio::test]
    async fn ignored_folders_never_appear() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/obj")).unwrap();
        fs::create_dir_all(temp.path().join("Bin")).unwrap();
        File::create(temp.path().join("src/obj/gen.cs")).unwrap();
        File::create(temp.path().join("Bin/app.dll")).unwrap();
        File::create(temp.path().join("src/main.cs")).unwrap();
        let indexer = indexer(false);

        let snapshot = indexer
            .index(temp.path(), &CancellationToken::noop())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(names(&snapshot), vec!["main.cs"]);
    }

    #[tokio::test]
    async fn cancelled_token_leaves_root_dirty() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.rs")).unwrap();
        let indexer = indexer(false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(indexer.index(temp.path(), &cancel).await.unwrap().is_none());
        let status = indexer.status(temp.path()).unwrap();
        assert_eq!(status.state, RootState::Dirty);
        assert_eq!(status.rescan_count, 0);
    }

    #[tokio::test]
    async fn cancelled_rescan_keeps_prior_snapshot() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.rs")).unwrap();
        File::create(temp.path().join("b.rs")).unwrap();
        let indexer = indexer(false);
        let before = indexer
            .index(temp.path(), &CancellationToken::noop())
            .await
            .unwrap()
            .unwrap();

        File::create(temp.path().join("c.rs")).unwrap();
        assert!(indexer.mark_dirty(temp.path()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(indexer.index(temp.path(), &cancel).await.unwrap().is_none());

        let index = indexer.cached(temp.path()).unwrap();
        assert!(indexer.rescan(&index, &cancel).await.unwrap().is_none());

        let status = indexer.status(temp.path()).unwrap();
        assert_eq!(status.state, RootState::Dirty);
        assert_eq!(status.entries, 2);
        assert_eq!(status.rescan_count, 1);
        let current = index.snapshot.load_full().unwrap();
        assert!(Arc::ptr_eq(&before, &current));
    }

    #[tokio::test]
    async fn path_changes_in_ignored_folders_keep_root_clean() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.rs")).unwrap();
        let indexer = indexer(false);
        indexer.index(temp.path(), &CancellationToken::noop()).await.unwrap();
        let root = normalize_root(temp.path());

        assert!(!indexer.notify_path_changed(temp.path(), &root.join("bin").join("x.dll")));
        assert_eq!(indexer.status(temp.path()).unwrap().state, RootState::Clean);

        assert!(indexer.notify_path_changed(temp.path(), &root.join("b.rs")));
        assert_eq!(indexer.status(temp.path()).unwrap().state, RootState::Dirty);
    }

    #[tokio::test]
    async fn refresh_forces_rescan() {
        let temp = TempDir::new().unwrap();
        let indexer = indexer(false);
        indexer.index(temp.path(), &CancellationToken::noop()).await.unwrap();
        File::create(temp.path().join("late.txt")).unwrap();

        let snapshot = indexer
            .refresh(temp.path(), &CancellationToken::noop())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(names(&snapshot), vec!["late.txt"]);
    }

    async fn settled_watch_mode(indexer: &Indexer, root: &Path) -> WatchMode {
        let mut mode = WatchMode::Pending;
        for _ in 0..100 {
            mode = indexer.status(root).unwrap().watch_mode;
            if mode != WatchMode::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        mode
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn changes_before_watch_attach_are_picked_up() {
        let temp = TempDir::new().unwrap();
        for i in 0..50 {
            fs::create_dir_all(temp.path().join(format!("d{i}"))).unwrap();
        }
        let indexer = indexer(true);
        indexer.index(temp.path(), &CancellationToken::noop()).await.unwrap();
        File::create(temp.path().join("d7").join("late.rs")).unwrap();

        let mode = settled_watch_mode(&indexer, temp.path()).await;
        if mode != WatchMode::Watching {
            // No usable notification backend on this host.
            assert_eq!(mode, WatchMode::Static);
            return;
        }

        let snapshot = indexer
            .index(temp.path(), &CancellationToken::noop())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(names(&snapshot), vec!["late.rs"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn watcher_marks_root_dirty_on_create() {
        let temp = TempDir::new().unwrap();
        let indexer = indexer(true);
        indexer.index(temp.path(), &CancellationToken::noop()).await.unwrap();

        let mode = settled_watch_mode(&indexer, temp.path()).await;
        if mode != WatchMode::Watching {
            // No usable notification backend on this host.
            assert_eq!(mode, WatchMode::Static);
            return;
        }
        // Attaching marks the root dirty once; settle that before creating.
        indexer.index(temp.path(), &CancellationToken::noop()).await.unwrap();

        File::create(temp.path().join("new.rs")).unwrap();
        let mut state = RootState::Clean;
        for _ in 0..250 {
            state = indexer.status(temp.path()).unwrap().state;
            if state == RootState::Dirty {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(state, RootState::Dirty);

        let snapshot = indexer
            .index(temp.path(), &CancellationToken::noop())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(names(&snapshot), vec!["new.rs"]);
    }
}
