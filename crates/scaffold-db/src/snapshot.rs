//! Typed JSON snapshot file.
//!
//! Used by the remote store to persist its search index: the whole value is
//! rewritten atomically after every mutation and loaded once at startup.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use scaffold_core::{Error, Result};

use crate::file_storage::{FilesystemBackend, StorageBackend};

/// A single JSON document of type `T` stored under one key.
pub struct SnapshotFile<T> {
    backend: Arc<dyn StorageBackend>,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SnapshotFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Snapshot at `<dir>/<file_name>`.
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self::with_backend(Arc::new(FilesystemBackend::new(dir)), file_name)
    }

    pub fn with_backend(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            _marker: PhantomData,
        }
    }

    /// Load the snapshot.
    ///
    /// `None` when no snapshot was ever written. A snapshot that exists but
    /// does not parse is `StorageCorruption`.
    pub async fn load(&self) -> Result<Option<T>> {
        let Some(bytes) = self.backend.read_if_exists(&self.key).await? else {
            info!(subsystem = "db", component = "snapshot", key = %self.key, "No snapshot found, starting empty");
            return Ok(None);
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            Error::StorageCorruption(format!("snapshot {} is unreadable: {}", self.key, e))
        })?;
        info!(
            subsystem = "db",
            component = "snapshot",
            key = %self.key,
            size = bytes.len(),
            "Loaded snapshot"
        );
        Ok(Some(value))
    }

    /// Atomically replace the snapshot with `value`.
    pub async fn save(&self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.backend.write(&self.key, &bytes).await?;
        debug!(subsystem = "db", component = "snapshot", key = %self.key, size = bytes.len(), "Saved snapshot");
        Ok(())
    }
}
