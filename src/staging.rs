//! Temporary on-disk copy of an uploaded PDF.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("{0}")]
    SaveFailed(#[from] std::io::Error),
}

/// A staged upload. The file outlives this value; call [`StagedFile::discard`]
/// once the remote upload is finished.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort removal on the blocking pool. A failure only leaks a temp
    /// file, so it is logged.
    pub async fn discard(self) {
        let path = self.path.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || self.remove()).await {
            warn!(path = %path.display(), error = %e, "staged file removal did not run");
        }
    }

    fn remove(self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "staged file removed"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove staged file"),
        }
    }
}

/// Writes `bytes` to a uniquely named `.pdf` file in the system temp directory.
/// The content is not validated. The write runs on the blocking pool.
pub async fn stage(bytes: Vec<u8>) -> Result<StagedFile, StagingError> {
    let dir = std::env::temp_dir();
    tokio::task::spawn_blocking(move || stage_in(&dir, &bytes))
        .await
        .map_err(|e| StagingError::SaveFailed(std::io::Error::other(e)))?
}

pub(crate) fn stage_in(dir: &Path, bytes: &[u8]) -> Result<StagedFile, StagingError> {
    let mut file = tempfile::Builder::new()
        .prefix("pdf-chat-")
        .suffix(".pdf")
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    debug!(path = %path.display(), bytes = bytes.len(), "upload staged");
    Ok(StagedFile { path })
}
