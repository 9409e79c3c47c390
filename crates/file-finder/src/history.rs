//! Persisted selection history used as the primary ranking signal.

mod persistence;
mod store;

pub use store::{HistoryScores, HistoryStore};
