//! # scaffold-db
//!
//! Storage layer for scaffold.
//!
//! This crate provides:
//! - Atomic whole-file storage (`file_storage`)
//! - The device-local record list (`records`)
//! - Typed JSON snapshots for the remote index (`snapshot`)
//! - The SQLite bearer token store (`tokens`) and its pool (`pool`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use scaffold_db::{Database, TokenRepository};
//!
//! let db = Database::open("data").await?;
//! let token = db.tokens.issue("alice").await?;
//! assert_eq!(db.tokens.resolve(&token).await?.as_deref(), Some("alice"));
//! ```

pub mod file_storage;
pub mod pool;
pub mod records;
pub mod snapshot;
pub mod tokens;

use std::path::{Path, PathBuf};

// Re-export core types
pub use scaffold_core::*;

pub use file_storage::{FilesystemBackend, StorageBackend};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use records::{JsonRecordStore, MemoryRecordStore};
pub use snapshot::SnapshotFile;
pub use tokens::SqliteTokenRepository;

use scaffold_core::defaults::TOKEN_DB_FILE;

/// Server-side storage rooted at one data directory.
#[derive(Clone)]
pub struct Database {
    /// Bearer token store.
    pub tokens: SqliteTokenRepository,
    data_dir: PathBuf,
}

impl Database {
    /// Open (creating if needed) the data directory and its token database.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir).await?;
        let tokens = SqliteTokenRepository::open(&data_dir.join(TOKEN_DB_FILE)).await?;
        Ok(Self { tokens, data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Snapshot file of type `T` inside the data directory.
    pub fn snapshot<T>(&self, file_name: &str) -> SnapshotFile<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        SnapshotFile::new(&self.data_dir, file_name)
    }
}
