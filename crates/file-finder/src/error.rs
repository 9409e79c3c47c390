use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Watch error for {path}: {message}")]
    Watch { path: PathBuf, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FinderError>;

/// Resolves a root to an absolute path.
///
/// Canonicalizes when the path exists so that `./src` and `/work/src` key the
/// same index; otherwise falls back to the lexically absolute form.
pub fn normalize_root(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

pub(crate) fn join_error(task: &str, error: tokio::task::JoinError) -> FinderError {
    FinderError::Internal(format!("{task} task failed: {error}"))
}
