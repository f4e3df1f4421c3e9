//! # path
//!
//! File path validation utilities.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EvalError, Result};

/// Return the path if it exists, otherwise a `MissingPath` error naming `kind`.
pub fn ensure_exists(kind: &'static str, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.exists() {
        Ok(path.to_path_buf())
    } else {
        Err(EvalError::MissingPath {
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Read an image set index file: one sample identifier per line.
pub fn read_image_set_index(path: &Path) -> Result<Vec<String>> {
    let path = ensure_exists("image set file", path)?;
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect())
}
