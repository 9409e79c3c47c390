//! Version-based cancellation shared by rescans and searches.
//!
//! A token remembers the version it was issued for and holds the shared
//! counter of the active version. When the counter moves on, every token of an
//! older version reads as cancelled. The scanner polls once per directory; the
//! match loops use `is_cancelled_sparse()` and only touch the atomic once per
//! `CANCEL_CHECK_INTERVAL` entries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Entries between two cancellation polls in a match loop. Must be a power of two.
pub const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// Tracks the active search version for cancellation.
///
/// When a new search starts, call `next_token()`. Tokens handed out for older
/// versions observe themselves as cancelled.
#[derive(Debug, Default)]
pub struct SearchVersionTracker {
    active_version: Arc<AtomicU64>,
}

impl SearchVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumps the active version, cancelling every token issued so far.
    pub fn next_version(&self) -> u64 {
        self.active_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The active version; does not cancel anything.
    pub fn current_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }

    /// Creates a token bound to the given version.
    pub fn token_for_version(&self, version: u64) -> CancellationToken {
        CancellationToken {
            active_version: self.active_version.clone(),
            version,
        }
    }

    /// Starts a new version and returns its token.
    pub fn next_token(&self) -> CancellationToken {
        let version = self.next_version();
        self.token_for_version(version)
    }
}

/// A cancellation token for terminating long-running operations.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    active_version: Arc<AtomicU64>,
    version: u64,
}

impl CancellationToken {
    /// Creates a standalone token that is cancelled only by `cancel()`.
    pub fn new() -> Self {
        Self {
            active_version: Arc::new(AtomicU64::new(0)),
            version: 0,
        }
    }

    /// A token that never reports cancelled.
    pub fn noop() -> Self {
        Self {
            active_version: noop_version().clone(),
            version: 0,
        }
    }

    /// Cancels this token and every clone of it.
    ///
    /// Calling this on a token created by `noop()` is a no-op.
    pub fn cancel(&self) {
        if Arc::ptr_eq(&self.active_version, noop_version()) {
            return;
        }
        let _ = self.active_version.compare_exchange(
            self.version,
            self.version.wrapping_add(1),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// `Some(())` while the token is live, `None` once cancelled, so callers
    /// returning `Option` can bail out with `?`.
    #[inline]
    pub fn is_cancelled(&self) -> Option<()> {
        if self.version != self.active_version.load(Ordering::Relaxed) {
            None
        } else {
            Some(())
        }
    }

    /// Like [`is_cancelled`](Self::is_cancelled), but only reads the atomic when
    /// `counter` is a multiple of [`CANCEL_CHECK_INTERVAL`].
    #[inline]
    pub fn is_cancelled_sparse(&self, counter: usize) -> Option<()> {
        if counter & (CANCEL_CHECK_INTERVAL - 1) == 0 {
            self.is_cancelled()
        } else {
            Some(())
        }
    }
}

fn noop_version() -> &'static Arc<AtomicU64> {
    static NOOP: OnceLock<Arc<AtomicU64>> = OnceLock::new();
    NOOP.get_or_init(|| Arc::new(AtomicU64::new(0)))
}

impl Default for CancellationToken {
    /// Default creates a noop token that is never cancelled.
    fn default() -> Self {
        Self::noop()
    }
}
