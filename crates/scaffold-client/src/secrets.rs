//! File-backed secret store.
//!
//! All secrets live in one JSON object, replaced atomically on every change
//! and readable only by the owning user on unix.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use scaffold_core::defaults::SECRETS_FILE;
use scaffold_core::{Error, Result, SecretStore};
use scaffold_db::{FilesystemBackend, StorageBackend};

pub struct FileSecretStore {
    backend: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl FileSecretStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: Arc::new(FilesystemBackend::new(data_dir).with_file_mode(0o600)),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match self.backend.read_if_exists(SECRETS_FILE).await? {
            None => Ok(BTreeMap::new()),
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::StorageCorruption(format!("{} does not parse: {}", SECRETS_FILE, e))
            }),
        }
    }

    async fn write_all(&self, secrets: &BTreeMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(secrets)?;
        self.backend.write(SECRETS_FILE, &bytes).await
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut secrets = self.read_all().await?;
        secrets.insert(key.to_string(), value.to_string());
        self.write_all(&secrets).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut secrets = self.read_all().await?;
        if secrets.remove(key).is_some() {
            self.write_all(&secrets).await?;
        }
        Ok(())
    }
}
