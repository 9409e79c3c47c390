//! Per-root file index: parallel scan, snapshot cache, change watching.

mod manager;
mod root;
mod state;
mod walk;
mod watcher;

pub use manager::Indexer;
pub use root::IndexSnapshot;
pub use state::{RootState, WatchMode};
pub use walk::{scan_root, ScanOutcome};
