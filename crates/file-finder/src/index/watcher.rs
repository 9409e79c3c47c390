//! Change notification via `notify`.
//!
//! The watcher never touches a snapshot. It only flips the root to dirty so the
//! next search pays for one rescan, however many events a build produced.

use std::path::Path;
use std::sync::{Arc, Weak};
use std::thread;

use notify::event::ModifyKind;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::root::RootIndex;
use super::state::WatchMode;
use crate::error::{FinderError, Result};
use crate::query::IgnoreRules;

/// Creates a recursive watcher for the root.
pub(crate) fn create_index_watcher(
    index: &Arc<RootIndex>,
    rules: Arc<IgnoreRules>,
) -> Result<RecommendedWatcher> {
    let weak: Weak<RootIndex> = Arc::downgrade(index);
    let mut watcher = recommended_watcher(move |event_result: notify::Result<Event>| {
        let Some(index) = weak.upgrade() else {
            return;
        };
        match event_result {
            Ok(event) => apply_notify_event(&index, &rules, event),
            Err(error) => {
                log::debug!(
                    "file index watcher error root={}: {error}",
                    index.root.display()
                );
                index.mark_dirty();
            }
        }
    })
    .map_err(|error| FinderError::Watch {
        path: index.root.clone(),
        message: format!("failed to create watcher: {error}"),
    })?;

    watcher
        .watch(&index.root, RecursiveMode::Recursive)
        .map_err(|error| FinderError::Watch {
            path: index.root.clone(),
            message: format!("failed to watch: {error}"),
        })?;

    Ok(watcher)
}

/// Attaches a watcher off the calling thread.
///
/// Recursive watches over large trees can take a while to register; searches
/// must not wait on that. On failure the root falls back to static mode for
/// the rest of its lifetime.
pub(crate) fn spawn_watcher_attach(index: Arc<RootIndex>, rules: Arc<IgnoreRules>) {
    thread::spawn(move || match create_index_watcher(&index, rules) {
        Ok(watcher) => {
            let mut slot = index.watcher.lock();
            if index.retired.load(std::sync::atomic::Ordering::Acquire) {
                return;
            }
            *slot = Some(watcher);
            index.set_watch_mode(WatchMode::Watching);
            // Changes made before the watch registered were never reported; the
            // snapshot built in the meantime may miss them.
            index.mark_dirty();
            log::debug!("file index watcher attached root={}", index.root.display());
        }
        Err(error) => {
            index.set_watch_mode(WatchMode::Static);
            log::warn!(
                "file index watcher disabled for {}, falling back to static cache: {error}",
                index.root.display()
            );
        }
    });
}

fn apply_notify_event(index: &RootIndex, rules: &IgnoreRules, event: Event) {
    if !changes_listing(&event.kind) {
        return;
    }

    if event.paths.is_empty() {
        index.mark_dirty();
        return;
    }

    if event
        .paths
        .iter()
        .any(|path| path_affects_root(rules, &index.root, path))
    {
        index.mark_dirty();
    }
}

/// Only creates, removes and renames change the set of file names.
fn changes_listing(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Any) => true,
        EventKind::Any | EventKind::Other => true,
        EventKind::Access(_) | EventKind::Modify(_) => false,
    }
}

/// True when `path` lies under `root` and outside every ignored folder.
pub(crate) fn path_affects_root(rules: &IgnoreRules, root: &Path, path: &Path) -> bool {
    path.starts_with(root) && !rules.is_ignored_path(root, path)
}
