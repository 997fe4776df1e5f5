//! # stower-adapter-index-fs
//!
//! Filesystem-backed file-index store. The index is a small JSON document
//! listing every log file name the tool has seen on a device, so repeated
//! pulls can tell new files from already-archived ones.
//!
//! Saves go through a sibling `.tmp` file and a rename, so a crash mid-save
//! leaves the previous snapshot intact.

use std::path::PathBuf;

use stower_core::ports::index::FileIndexStore;
use stower_core::{FileIndex, StoreError};

/// Stores the file index as pretty-printed JSON at a fixed path.
pub struct FsFileIndexStore {
    path: PathBuf,
}

impl FsFileIndexStore {
    /// Create a store backed by the given path. Neither the file nor its
    /// parent directory has to exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FileIndexStore for FsFileIndexStore {
    async fn load(&self) -> Result<FileIndex, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no index file yet, starting empty");
                return Ok(FileIndex::new());
            }
            Err(err) => return Err(StoreError::new("could not read the index file", err)),
        };

        serde_json::from_slice(&bytes)
            .map_err(|err| StoreError::new("index file is not valid JSON", err))
    }

    async fn save(&self, index: &FileIndex) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(index)
            .map_err(|err| StoreError::new("could not serialize the index", err))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|err| StoreError::new("could not write the index file", err))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| StoreError::new("could not replace the index file", err))?;

        tracing::debug!(path = %self.path.display(), files = index.len(), "index saved");
        Ok(())
    }
}
