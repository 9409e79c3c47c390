//! In-process file-name search for a developer workspace.
//!
//! This crate provides:
//! - A parallel indexer with per-root snapshot caching and lazy rescans
//! - Wildcard and modifier query matching
//! - Bounded top-K ranking biased by persisted selection history

pub mod cancel;
pub mod config;
pub mod error;
pub mod history;
pub mod index;
pub mod query;
pub mod search;
pub mod types;

// Re-export main types
pub use cancel::{CancellationToken, SearchVersionTracker};
pub use config::FinderConfig;
pub use error::{normalize_root, FinderError, Result};
pub use history::HistoryStore;
pub use index::{IndexSnapshot, Indexer, RootState, WatchMode};
pub use query::{IgnoreRules, SearchQuery, WildcardPattern};
pub use search::{IconResolver, SearchEngine};
pub use types::{FileEntry, IndexStatus, SearchHit, SearchResults};
