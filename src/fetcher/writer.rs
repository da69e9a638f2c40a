use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::app::{FetchError, Result};
use crate::config::WriteMode;
use crate::domain::CacheSlot;
use crate::fetcher::BodyStream;

/// Bytes written per `write_all` call.
pub const CHUNK_SIZE: usize = 1024;

/// Owns the single open file handle of a cache refresh. Dropping it without
/// [`commit`](Self::commit) never leaves partial content at the cache path.
pub struct CacheWriter {
    file: File,
    /// Atomic mode only: renamed over `path` on commit.
    temp: Option<NamedTempFile>,
    path: PathBuf,
}

impl CacheWriter {
    /// Truncate mode empties the cache file right here, before any request.
    pub async fn open(slot: &CacheSlot, mode: WriteMode) -> Result<Self> {
        let path = slot.path().to_path_buf();
        match mode {
            WriteMode::Atomic => {
                let temp = temp_file_beside(&path)?;
                let file = File::from_std(temp.as_file().try_clone()?);
                Ok(Self {
                    file,
                    temp: Some(temp),
                    path,
                })
            }
            WriteMode::Truncate => Ok(Self {
                file: File::create(&path).await?,
                temp: None,
                path,
            }),
        }
    }

    /// Stream `body` to the file, returning the number of bytes written.
    ///
    /// On a body or IO error the file is emptied again before returning.
    pub async fn write_body(&mut self, body: BodyStream) -> Result<u64> {
        let result = self.copy(body).await;
        if result.is_err() {
            self.file.set_len(0).await?;
        }
        result
    }

    async fn copy(&mut self, mut body: BodyStream) -> Result<u64> {
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for block in chunk.chunks(CHUNK_SIZE) {
                self.file.write_all(block).await?;
                written += block.len() as u64;
            }
        }
        Ok(written)
    }

    /// Make the written content visible at the cache path.
    ///
    /// A replaced cache file keeps its permissions.
    pub async fn commit(mut self) -> Result<()> {
        self.file.flush().await?;

        if let Some(temp) = self.temp.take() {
            if let Ok(previous) = tokio::fs::metadata(&self.path).await {
                temp.as_file().set_permissions(previous.permissions())?;
            }
            temp.persist(&self.path)
                .map_err(|e| FetchError::Io(e.error))?;
        }

        tracing::debug!("Committed {}", self.path.display());
        Ok(())
    }
}

/// Temporary file in the directory of `path`, created with the mode a plain
/// `File::create` would get instead of owner-only.
pub(crate) fn temp_file_beside(path: &Path) -> io::Result<NamedTempFile> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut builder = tempfile::Builder::new();
    builder.prefix(".feedcache-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}
