//! Whole-file blob storage with atomic replacement.
//!
//! Every write lands in a sibling temp file that is fsynced and then renamed
//! over the destination, so a reader (or a process restarted after a crash)
//! sees either the previous content or the new content, never a torn write.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use scaffold_core::Result;

/// Storage backend trait for different storage implementations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Atomically replace the content at `path`.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read the content at `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Read the content at `path`, or `None` if nothing was ever written there.
    async fn read_if_exists(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Delete data at `path`. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Filesystem storage backend rooted at a base directory.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
    file_mode: u32,
}

impl FilesystemBackend {
    /// Create a backend writing world-readable (0644) files under `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            file_mode: 0o644,
        }
    }

    /// Permission bits applied to every written file (unix only).
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Validate that the backend can write, read, and delete files.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let probe = ".health-check";
        let data = b"storage-health-check";
        self.write(probe, data)
            .await
            .map_err(|e| format!("write({:?}): {}", self.full_path(probe), e))?;
        let read_back = self
            .read(probe)
            .await
            .map_err(|e| format!("read({:?}): {}", self.full_path(probe), e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }
        self.delete(probe)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", self.full_path(probe), e))?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        debug!(storage_path = %path, full_path = %full_path.display(), size = data.len(), "file_storage: write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "file_storage: create_dir_all failed");
                e
            })?;
        }

        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_storage: File::create failed");
            e
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(self.file_mode))
                .await?;
        }

        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "file_storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_storage: rename failed");
            e
        })?;

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.full_path(path)).await?)
    }

    async fn read_if_exists(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.full_path(path)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(path)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        backend.write("a/b.json", b"[1]").await.unwrap();
        assert!(backend.exists("a/b.json").await.unwrap());
        assert_eq!(backend.read("a/b.json").await.unwrap(), b"[1]");

        backend.write("a/b.json", b"[2]").await.unwrap();
        assert_eq!(backend.read("a/b.json").await.unwrap(), b"[2]");
        assert!(!dir.path().join("a/b.json.tmp").exists());

        backend.delete("a/b.json").await.unwrap();
        backend.delete("a/b.json").await.unwrap();
        assert!(!backend.exists("a/b.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_if_exists_missing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        assert!(backend.read_if_exists("nope").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_mode_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).with_file_mode(0o600);
        backend.write("secrets.json", b"{}").await.unwrap();
        let mode = std::fs::metadata(dir.path().join("secrets.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        FilesystemBackend::new(dir.path()).validate().await.unwrap();
    }
}
