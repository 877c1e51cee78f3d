//! The remote store's persistent, tenant-filtered search index.
//!
//! Mutations and the snapshot write that follows them run under one write
//! guard: once a mutation is acknowledged it is on disk, and readers never
//! see a state that was not (or will not be) persisted. A failed snapshot
//! write rolls the in-memory change back.

use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use scaffold_core::{Error, RemoteRecord, Result};
use scaffold_db::SnapshotFile;
use scaffold_search::TextIndex;

pub struct RemoteIndex {
    index: RwLock<TextIndex>,
    snapshot: SnapshotFile<TextIndex>,
}

impl RemoteIndex {
    /// Load the snapshot, or start empty if none exists.
    ///
    /// A snapshot that exists but cannot be read is an error; it is never
    /// silently replaced by an empty index.
    pub async fn open(snapshot: SnapshotFile<TextIndex>) -> Result<Self> {
        let index = snapshot.load().await?.unwrap_or_default();
        info!(
            subsystem = "api",
            component = "index",
            record_count = index.len(),
            "Index loaded"
        );
        Ok(Self {
            index: RwLock::new(index),
            snapshot,
        })
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    /// Store a new record for `owner` and return its cloud id.
    #[instrument(skip(self, title, tags), fields(subsystem = "api", component = "index", op = "insert"))]
    pub async fn insert(&self, owner: &str, title: String, tags: Vec<String>) -> Result<String> {
        let mut index = self.index.write().await;

        let mut id = Uuid::now_v7().to_string();
        while index.contains(&id) {
            id = Uuid::now_v7().to_string();
        }

        index.insert(RemoteRecord {
            id: id.clone(),
            title,
            tags,
            owner: owner.to_string(),
        });

        if let Err(e) = self.snapshot.save(&index).await {
            index.remove(&id);
            return Err(e);
        }
        debug!(cloud_id = %id, owner = %owner, "Inserted record");
        Ok(id)
    }

    /// Replace title and tags of a record owned by `owner`.
    #[instrument(skip(self, title, tags), fields(subsystem = "api", component = "index", op = "update"))]
    pub async fn update(
        &self,
        owner: &str,
        id: &str,
        title: String,
        tags: Vec<String>,
    ) -> Result<()> {
        let mut index = self.index.write().await;
        let previous = owned(&index, owner, id)?.clone();

        index.insert(RemoteRecord {
            id: id.to_string(),
            title,
            tags,
            owner: owner.to_string(),
        });

        if let Err(e) = self.snapshot.save(&index).await {
            index.insert(previous);
            return Err(e);
        }
        Ok(())
    }

    /// Delete a record owned by `owner`.
    #[instrument(skip(self), fields(subsystem = "api", component = "index", op = "remove"))]
    pub async fn remove(&self, owner: &str, id: &str) -> Result<()> {
        let mut index = self.index.write().await;
        owned(&index, owner, id)?;

        let Some(removed) = index.remove(id) else {
            return Err(Error::NotFound(id.to_string()));
        };

        if let Err(e) = self.snapshot.save(&index).await {
            index.insert(removed);
            return Err(e);
        }
        Ok(())
    }

    /// A record owned by `owner`.
    pub async fn get(&self, owner: &str, id: &str) -> Result<RemoteRecord> {
        let index = self.index.read().await;
        owned(&index, owner, id).cloned()
    }

    /// Ranked hits for `query`, restricted to records owned by `owner`.
    pub async fn search(&self, owner: &str, query: &str) -> Vec<RemoteRecord> {
        let start = Instant::now();
        let index = self.index.read().await;
        let results: Vec<RemoteRecord> = index
            .search(query)
            .into_iter()
            .filter(|hit| hit.record.owner == owner)
            .map(|hit| hit.record)
            .collect();
        debug!(
            subsystem = "api",
            component = "index",
            op = "search",
            owner = %owner,
            query = %query,
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );
        results
    }

    /// Write the current state to disk.
    pub async fn flush(&self) -> Result<()> {
        let index = self.index.write().await;
        self.snapshot.save(&index).await?;
        info!(
            subsystem = "api",
            component = "index",
            op = "flush",
            record_count = index.len(),
            "Index flushed"
        );
        Ok(())
    }
}

/// The record with `id` if it belongs to `owner`; `NotFound` otherwise, so a
/// foreign record is indistinguishable from a missing one.
fn owned<'a>(index: &'a TextIndex, owner: &str, id: &str) -> Result<&'a RemoteRecord> {
    index
        .get(id)
        .filter(|record| record.owner == owner)
        .ok_or_else(|| Error::NotFound(id.to_string()))
}
