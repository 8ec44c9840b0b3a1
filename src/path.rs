//! Path resolution and manipulation utilities.

use crate::config::{PATH_SEPARATOR, ROOT_NAME};
use crate::directory::{Namespace, ROOT_DIR};
use crate::{Entry, Error, Result};

/// Resolves an absolute path like `/a/b/c` to the entry it names.
/// Empty components are ignored, so `/a//b/` equals `/a/b`.
pub fn resolve(ns: &Namespace, path: &str) -> Result<Entry> {
    let mut current = Entry::Directory(ROOT_DIR);
    for component in path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
        let Entry::Directory(dir) = current else {
            return Err(Error::NotDirectory);
        };
        current = ns.lookup(dir, component)?;
    }
    Ok(current)
}

/// Splits a path into its parent path and final component.
/// e.g. `/a/b/c` -> (`/a/b`, `c`), `/c` -> (`/`, `c`).
pub fn split(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches(PATH_SEPARATOR);
    match trimmed.rfind(PATH_SEPARATOR) {
        Some(0) => (ROOT_NAME.to_string(), trimmed[1..].to_string()),
        Some(idx) => (trimmed[..idx].to_string(), trimmed[idx + 1..].to_string()),
        None => (ROOT_NAME.to_string(), trimmed.to_string()),
    }
}
