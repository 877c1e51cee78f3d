//! Device-local record list.
//!
//! [`JsonRecordStore`] keeps the whole list as one JSON array in a single
//! file. Each mutation holds the store's mutex across read, modify and the
//! atomic file replace, so concurrent writers (the enrichment pipeline, the
//! sync merge, user edits) never lose each other's updates.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use scaffold_core::defaults::RECORDS_FILE;
use scaffold_core::{Error, Record, RecordStore, Result};

use crate::file_storage::{FilesystemBackend, StorageBackend};

fn insert_front(records: &mut Vec<Record>, record: Record) -> Result<()> {
    if records.iter().any(|r| r.id == record.id) {
        return Err(Error::InvalidInput(format!(
            "record id {} already exists",
            record.id
        )));
    }
    records.insert(0, record);
    Ok(())
}

fn patch_by_id(
    records: &mut [Record],
    id: &str,
    patch: &mut (dyn for<'r> FnMut(&'r mut Record) + Send),
) -> bool {
    match records.iter_mut().find(|r| r.id == id) {
        Some(record) => {
            patch(record);
            true
        }
        None => false,
    }
}

fn delete_by_id(records: &mut Vec<Record>, id: &str) -> bool {
    let before = records.len();
    records.retain(|r| r.id != id);
    records.len() != before
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

/// Record list persisted as `<data_dir>/images.json`.
pub struct JsonRecordStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    write_lock: Mutex<()>,
}

impl JsonRecordStore {
    /// Store rooted at `data_dir`, using the well-known records file name.
    pub fn new(data_dir: impl Into<std::path::PathBuf>) -> Self {
        Self::with_backend(Arc::new(FilesystemBackend::new(data_dir)), RECORDS_FILE)
    }

    /// Store over an arbitrary backend and key.
    pub fn with_backend(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_list(&self) -> Result<Vec<Record>> {
        match self.backend.read_if_exists(&self.key).await? {
            None => Ok(Vec::new()),
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::StorageCorruption(format!("{} does not parse as a record list: {}", self.key, e))
            }),
        }
    }

    async fn write_list(&self, records: &[Record]) -> Result<()> {
        let bytes = serde_json::to_vec(records)?;
        self.backend.write(&self.key, &bytes).await?;
        debug!(
            subsystem = "db",
            component = "records",
            record_count = records.len(),
            "Persisted record list"
        );
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn load(&self) -> Result<Vec<Record>> {
        let _guard = self.write_lock.lock().await;
        self.read_list().await
    }

    async fn replace_all(&self, records: Vec<Record>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_list(&records).await
    }

    #[instrument(skip(self, record), fields(subsystem = "db", component = "records", op = "insert_front", record_id = %record.id))]
    async fn insert_front(&self, record: Record) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_list().await?;
        insert_front(&mut records, record)?;
        self.write_list(&records).await
    }

    async fn patch_by_id(
        &self,
        id: &str,
        patch: &mut (dyn for<'r> FnMut(&'r mut Record) + Send),
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_list().await?;
        if !patch_by_id(&mut records, id, patch) {
            debug!(subsystem = "db", component = "records", record_id = %id, "Patch target missing");
            return Ok(false);
        }
        self.write_list(&records).await?;
        Ok(true)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_list().await?;
        if !delete_by_id(&mut records, id) {
            return Ok(false);
        }
        self.write_list(&records).await?;
        Ok(true)
    }

    async fn update(
        &self,
        f: &mut (dyn for<'r> FnMut(&'r mut Vec<Record>) -> Result<()> + Send),
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_list().await?;
        f(&mut records)?;
        self.write_list(&records).await
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Non-persistent record list with the same semantics as [`JsonRecordStore`].
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load(&self) -> Result<Vec<Record>> {
        Ok(self.records.lock().await.clone())
    }

    async fn replace_all(&self, records: Vec<Record>) -> Result<()> {
        *self.records.lock().await = records;
        Ok(())
    }

    async fn insert_front(&self, record: Record) -> Result<()> {
        insert_front(&mut *self.records.lock().await, record)
    }

    async fn patch_by_id(
        &self,
        id: &str,
        patch: &mut (dyn for<'r> FnMut(&'r mut Record) + Send),
    ) -> Result<bool> {
        Ok(patch_by_id(&mut self.records.lock().await, id, patch))
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        Ok(delete_by_id(&mut *self.records.lock().await, id))
    }

    async fn update(
        &self,
        f: &mut (dyn for<'r> FnMut(&'r mut Vec<Record>) -> Result<()> + Send),
    ) -> Result<()> {
        let mut guard = self.records.lock().await;
        let mut working = guard.clone();
        f(&mut working)?;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaffold_core::Enrichment;

    fn enrichment(title: &str) -> Enrichment {
        Enrichment {
            title: title.to_string(),
            tags: vec!["tag".to_string()],
        }
    }

    #[tokio::test]
    async fn test_load_empty_when_nothing_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_front_prepends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        store.insert_front(Record::new_link("a", "https://a")).await.unwrap();
        store.insert_front(Record::new_link("b", "https://b")).await.unwrap();

        let reopened = JsonRecordStore::new(dir.path());
        let ids: Vec<String> = reopened.load().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryRecordStore::new();
        store.insert_front(Record::new_link("a", "https://a")).await.unwrap();
        let err = store
            .insert_front(Record::new_link("a", "https://other"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_patch_only_touches_target() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        store.insert_front(Record::new_link("a", "https://a")).await.unwrap();
        store.insert_front(Record::new_link("b", "https://b")).await.unwrap();

        let e = enrichment("patched");
        let matched = store
            .patch_by_id("a", &mut |r| r.apply_enrichment(&e))
            .await
            .unwrap();
        assert!(matched);

        let records = store.load().await.unwrap();
        assert_eq!(records[1].title, "patched");
        assert_eq!(records[0].title, "");
        assert!(records[0].awaiting_enrichment());
    }

    #[tokio::test]
    async fn test_patch_missing_id_is_noop() {
        let store = MemoryRecordStore::new();
        let matched = store.patch_by_id("ghost", &mut |_| {}).await.unwrap();
        assert!(!matched);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        store.insert_front(Record::new_link("a", "https://a")).await.unwrap();
        store.insert_front(Record::new_link("b", "https://b")).await.unwrap();

        assert!(store.delete_by_id("a").await.unwrap());
        assert!(!store.delete_by_id("a").await.unwrap());
        assert_eq!(store.load().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        store.insert_front(Record::new_link("a", "https://a")).await.unwrap();

        let result = store
            .update(&mut |records| {
                records.clear();
                Err(Error::Internal("abort".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.load().await.unwrap().len(), 1);

        let memory = MemoryRecordStore::with_records(vec![Record::new_link("a", "https://a")]);
        let result = memory
            .update(&mut |records| {
                records.clear();
                Err(Error::Internal("abort".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(memory.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_storage_corruption() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RECORDS_FILE), b"{not json").unwrap();
        let store = JsonRecordStore::new(dir.path());
        assert!(matches!(
            store.load().await.unwrap_err(),
            Error::StorageCorruption(_)
        ));
        assert!(matches!(
            store.insert_front(Record::new_link("a", "https://a")).await.unwrap_err(),
            Error::StorageCorruption(_)
        ));
    }

    #[tokio::test]
    async fn test_record_with_both_sources_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(RECORDS_FILE),
            br#"[{"id":"a","uri":"file:///a","url":"https://a","title":"","tags":[]}]"#,
        )
        .unwrap();
        let store = JsonRecordStore::new(dir.path());
        assert!(matches!(
            store.load().await.unwrap_err(),
            Error::StorageCorruption(_)
        ));
    }
}
