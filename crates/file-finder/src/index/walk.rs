//! Parallel work-stealing directory scan.
//!
//! A fixed set of worker threads shares one channel of pending directories and
//! one atomic pending-work counter. The counter starts at 1 (the root), grows
//! by one for every directory pushed and shrinks by one for every directory
//! finished. The worker that takes it to zero sends one stop message per
//! worker; that happens exactly once, after the last directory has been fully
//! processed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::cancel::CancellationToken;
use crate::query::IgnoreRules;
use crate::types::FileEntry;

/// Output of a completed scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Files sorted by relative path.
    pub entries: Vec<FileEntry>,
    pub scanned_dirs: usize,
    /// Directories that could not be listed.
    pub errors: usize,
}

#[derive(Debug)]
enum ScanJob {
    Dir(PathBuf),
    Stop,
}

/// Shared state for one scan.
struct ScanContext<'a> {
    root: &'a Path,
    rules: &'a IgnoreRules,
    cancel: &'a CancellationToken,
    workers: usize,
    sender: Sender<ScanJob>,
    receiver: Receiver<ScanJob>,
    outstanding: AtomicUsize,
    cancelled: AtomicBool,
    scanned_dirs: AtomicUsize,
    errors: AtomicUsize,
}

impl ScanContext<'_> {
    fn worker(&self) -> Vec<FileEntry> {
        let _guard = StopOnPanic(self);
        let mut entries = Vec::new();
        while let Ok(ScanJob::Dir(dir)) = self.receiver.recv() {
            // Once cancelled, queued directories are drained without being
            // listed so the counter still reaches zero.
            if self.cancelled.load(Ordering::Acquire) || self.cancel.is_cancelled().is_none() {
                self.cancelled.store(true, Ordering::Release);
            } else {
                self.scan_dir(&dir, &mut entries);
            }

            if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
                self.stop_workers();
            }
        }
        entries
    }

    fn push_dir(&self, dir: PathBuf) {
        // Count before publishing so the counter can never hit zero early.
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        // Both channel ends live in the context, so the send cannot fail.
        let _ = self.sender.send(ScanJob::Dir(dir));
    }

    fn stop_workers(&self) {
        for _ in 0..self.workers {
            let _ = self.sender.send(ScanJob::Stop);
        }
    }

    fn scan_dir(&self, dir: &Path, entries: &mut Vec<FileEntry>) {
        self.scanned_dirs.fetch_add(1, Ordering::Relaxed);
        let read_dir = match fs::read_dir(dir) {
            Ok(iter) => iter,
            Err(error) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                log::debug!("skipping unreadable directory {}: {error}", dir.display());
                return;
            }
        };

        for entry in read_dir {
            let Ok(entry) = entry else {
                self.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if self.rules.is_ignored_folder(&entry.file_name().to_string_lossy()) {
                    continue;
                }
                self.push_dir(entry.path());
            } else if file_type.is_file() || (file_type.is_symlink() && symlink_is_file(&entry)) {
                if let Some(file) = FileEntry::from_paths(self.root, entry.path()) {
                    entries.push(file);
                }
            }
        }
    }
}

/// Aborts the scan if a worker unwinds; otherwise the pending counter would
/// never reach zero and the remaining workers would block forever.
struct StopOnPanic<'a, 'b>(&'a ScanContext<'b>);

impl Drop for StopOnPanic<'_, '_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.cancelled.store(true, Ordering::Release);
            self.0.stop_workers();
        }
    }
}

/// Symlinked directories are not followed; that keeps the walk free of cycles.
fn symlink_is_file(entry: &fs::DirEntry) -> bool {
    fs::metadata(entry.path())
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

/// Scans `root` with `threads` workers.
///
/// Returns `None` if cancelled. Directories that cannot be read are counted in
/// `errors` and skipped.
pub fn scan_root(
    root: &Path,
    rules: &IgnoreRules,
    threads: usize,
    cancel: &CancellationToken,
) -> Option<ScanOutcome> {
    let threads = threads.max(1);
    let (sender, receiver) = crossbeam_channel::unbounded();
    let context = ScanContext {
        root,
        rules,
        cancel,
        workers: threads,
        sender,
        receiver,
        outstanding: AtomicUsize::new(0),
        cancelled: AtomicBool::new(false),
        scanned_dirs: AtomicUsize::new(0),
        errors: AtomicUsize::new(0),
    };
    context.push_dir(root.to_path_buf());

    let mut entries = thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|_| scope.spawn(|| context.worker()))
            .collect();

        let mut entries = Vec::new();
        for worker in workers {
            if let Ok(mut batch) = worker.join() {
                entries.append(&mut batch);
            }
        }
        entries
    });

    if context.cancelled.load(Ordering::Acquire) || cancel.is_cancelled().is_none() {
        return None;
    }

    entries.sort_unstable_by(|a, b| a.relative_path().cmp(b.relative_path()));

    Some(ScanOutcome {
        entries,
        scanned_dirs: context.scanned_dirs.load(Ordering::Relaxed),
        errors: context.errors.load(Ordering::Relaxed),
    })
}
