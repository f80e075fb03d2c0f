// SPDX-License-Identifier: MIT OR Apache-2.0
//! File discovery (spec §4.12 step 1, C12.a): turn a configured input
//! path into the sorted list of `.csl` files a compile run will parse.

use nomos_error::{CodedError, ErrorCode};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from resolving a configured input path to a file list.
#[derive(Debug, Error)]
pub enum DiscoverError {
    /// Neither a file nor a directory exists at the configured path.
    #[error("input path {0:?} does not exist")]
    NotFound(String),

    /// A single-file input lacks the required `.csl` suffix.
    #[error("input file {0:?} does not have a .csl extension")]
    WrongExtension(String),

    /// Reading a directory's entries failed.
    #[error("failed to read directory {path:?}: {source}")]
    ReadDir {
        /// Directory that failed to read.
        path: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl CodedError for DiscoverError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::UsageInputNotFound,
            Self::WrongExtension(_) => ErrorCode::UsageWrongExtension,
            Self::ReadDir { .. } => ErrorCode::UsageInputNotFound,
        }
    }
}

const SOURCE_EXTENSION: &str = "csl";

/// Resolve `path` to the sorted list of absolute `.csl` file paths it
/// names: itself (if a file) or its non-recursive directory listing.
pub async fn discover_input_files(path: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| DiscoverError::NotFound(path.display().to_string()))?;

    if metadata.is_file() {
        if !has_source_extension(path) {
            return Err(DiscoverError::WrongExtension(path.display().to_string()));
        }
        let absolute = absolute_path(path);
        return Ok(vec![absolute]);
    }

    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|source| DiscoverError::ReadDir {
            path: path.display().to_string(),
            source,
        })?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| DiscoverError::ReadDir {
            path: path.display().to_string(),
            source,
        })?
    {
        let entry_path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|ft| ft.is_file())
            .unwrap_or(false);
        if is_file && has_source_extension(&entry_path) {
            files.push(absolute_path(&entry_path));
        }
    }

    files.sort();
    Ok(files)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
        .unwrap_or(false)
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
