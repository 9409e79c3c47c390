//! Search functionality over indexed roots.
//!
//! This module provides:
//! - The `SearchEngine` entry point
//! - Bounded top-K ranking

mod engine;
mod rank;

// Re-export main types
pub use engine::{IconResolver, SearchEngine};
pub use rank::{select_top_n, BrowseCandidate, RankedCandidate, TopK};
