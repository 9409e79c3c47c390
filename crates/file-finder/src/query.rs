//! Query parsing and matching for file-name search.
//!
//! This module provides:
//! - `*` wildcard patterns compiled into literal segments
//! - Structured query parsing (free text, extension and path modifiers)
//! - Ignore rules for folders and files
//! - Extension categories used by ranking

mod file_kind;
mod ignore;
mod search_query;
mod wildcard;

pub use file_kind::{extension_of_name, is_code_file};
pub use ignore::IgnoreRules;
pub use search_query::SearchQuery;
pub use wildcard::WildcardPattern;
