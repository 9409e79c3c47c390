//! Per-root cache state and watch mode.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Freshness of a root's snapshot.
///
/// Transitions:
/// - change event: any state → `Dirty`
/// - rescan start: `Dirty`/`Clean` → `Rescanning`
/// - rescan complete: `Rescanning` → `Clean` (only if no event arrived meanwhile)
/// - rescan cancelled: `Rescanning` → `Dirty`
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RootState {
    Dirty = 0,
    Rescanning = 1,
    Clean = 2,
}

impl RootState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dirty => "dirty",
            Self::Rescanning => "rescanning",
            Self::Clean => "clean",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Rescanning,
            2 => Self::Clean,
            _ => Self::Dirty,
        }
    }
}

/// Lock-free holder for a [`RootState`].
#[derive(Debug)]
pub struct AtomicRootState(AtomicU8);

impl Default for AtomicRootState {
    fn default() -> Self {
        Self(AtomicU8::new(RootState::Dirty as u8))
    }
}

impl AtomicRootState {
    pub fn load(&self) -> RootState {
        RootState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Records a change event. Wins over any concurrent rescan.
    pub fn mark_dirty(&self) {
        self.0.store(RootState::Dirty as u8, Ordering::Release);
    }

    pub fn begin_rescan(&self) {
        self.0.store(RootState::Rescanning as u8, Ordering::Release);
    }

    /// Moves `Rescanning` to `Clean`. Returns false if a change event raced the
    /// rescan, in which case the root stays `Dirty`.
    pub fn finish_rescan(&self) -> bool {
        self.0
            .compare_exchange(
                RootState::Rescanning as u8,
                RootState::Clean as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn abort_rescan(&self) {
        let _ = self.0.compare_exchange(
            RootState::Rescanning as u8,
            RootState::Dirty as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// How a root learns about filesystem changes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum WatchMode {
    /// No watcher has been attached yet.
    Pending = 0,
    /// A watcher marks the root dirty on change events.
    Watching = 1,
    /// Attaching failed; the snapshot only refreshes on manual refresh.
    Static = 2,
    /// Watching is turned off in config.
    Disabled = 3,
}

impl WatchMode {
    pub fn load(atomic: &AtomicU8) -> Self {
        match atomic.load(Ordering::Acquire) {
            1 => Self::Watching,
            2 => Self::Static,
            3 => Self::Disabled,
            _ => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Watching => "watching",
            Self::Static => "static",
            Self::Disabled => "disabled",
        }
    }

    /// True when the caller should offer a manual refresh action.
    pub fn needs_manual_refresh(self) -> bool {
        matches!(self, Self::Static | Self::Disabled)
    }
}
