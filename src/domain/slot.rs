use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::app::{FetchError, Result};

/// A single local file holding the last known good copy of a remote resource.
///
/// Nothing about the file is stored here; size and mtime are read from disk
/// every time they are asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlot {
    path: PathBuf,
}

impl CacheSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Size in bytes, 0 when the file is missing.
    pub fn size(&self) -> u64 {
        fs::metadata(&self.path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Filesystem mtime, `None` when the file is missing or the platform
    /// does not report it.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(&self.path).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Create the parent directory (recursively) if it is missing.
    pub fn ensure_parent(&self) -> Result<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.is_dir() {
            return Ok(());
        }

        fs::create_dir_all(parent).map_err(|source| {
            tracing::error!("Failed to create {}", parent.display());
            FetchError::DirectoryCreation {
                path: parent.to_path_buf(),
                source,
            }
        })
    }
}
