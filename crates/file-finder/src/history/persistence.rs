//! History file format: one `<count>|<absolute path>` record per line.

use std::fs;
use std::hash::Hasher;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use fnv::FnvHasher;
use tempfile::NamedTempFile;

use crate::error::{FinderError, Result};

const HISTORY_EXTENSION: &str = "history";

/// File name for the history of `root`, stable across runs.
pub(crate) fn history_file_name(root: &Path) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(root.to_string_lossy().as_bytes());
    format!("{:016x}.{HISTORY_EXTENSION}", hasher.finish())
}

/// Parses history text. Lines without a `|`, with a non-numeric or zero count,
/// or with an empty path are skipped.
pub(crate) fn parse_history(text: &str) -> Vec<(Box<str>, u32)> {
    text.lines()
        .filter_map(|line| {
            let (count, path) = line.split_once('|')?;
            let count: u32 = count.trim().parse().ok()?;
            let path = path.trim_end_matches('\r');
            if count == 0 || path.is_empty() {
                return None;
            }
            Some((path.into(), count))
        })
        .collect()
}

/// Reads a history file. A missing or unreadable file is empty history.
pub(crate) fn read_history(path: &Path) -> Vec<(Box<str>, u32)> {
    match fs::read(path) {
        Ok(bytes) => parse_history(&String::from_utf8_lossy(&bytes)),
        Err(error) if error.kind() == ErrorKind::NotFound => Vec::new(),
        Err(error) => {
            log::warn!("history load failed path={}: {error}", path.display());
            Vec::new()
        }
    }
}

/// Writes records highest count first, replacing the file atomically.
pub(crate) fn write_history(path: &Path, records: &mut [(Box<str>, u32)]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        FinderError::InvalidInput(format!("history path has no parent: {}", path.display()))
    })?;
    fs::create_dir_all(parent)?;

    records.sort_unstable_by(|(a_path, a_count), (b_path, b_count)| {
        b_count.cmp(a_count).then_with(|| a_path.cmp(b_path))
    });

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut output = BufWriter::new(temp.as_file());
        for (record_path, count) in records.iter() {
            writeln!(output, "{count}|{record_path}")?;
        }
        output.flush()?;
    }
    temp.persist(path).map_err(|error| FinderError::Io(error.error))?;
    Ok(())
}
