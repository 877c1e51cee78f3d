//! Sync reconciler: pushes local records to the remote store and removes
//! them remote-first.
//!
//! Uploads run concurrently against a snapshot of the list; their results
//! are merged into the list as it is *now*, inside a single store update,
//! so records added, enriched, edited or deleted while requests were in
//! flight are never overwritten by stale snapshot data.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use scaffold_core::{Error, InsertRequest, Record, RecordStore, Result, SyncAction};

use crate::remote::RemoteClient;

/// Result of [`SyncReconciler::upload_all`].
#[derive(Debug)]
pub enum UploadOutcome {
    /// No record was eligible; no request was sent.
    NothingToUpload,
    Completed(UploadReport),
}

#[derive(Debug, Default)]
pub struct UploadReport {
    /// Local ids of records that now carry a cloud id for their latest upload.
    pub uploaded: Vec<String>,
    /// Local ids whose upload failed, with the reason. Their sync fields are untouched.
    pub failed: Vec<(String, Error)>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of removing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// Removed locally and, if it had been uploaded, remotely.
    Removed,
    /// Removed locally; the remote copy could not be removed.
    RemovedLocally { warning: String },
}

#[derive(Debug, Default)]
pub struct RemovalReport {
    pub removed: Vec<String>,
    /// Removed locally only, with the warning.
    pub warnings: Vec<(String, String)>,
    /// Not removed at all.
    pub failed: Vec<(String, Error)>,
}

pub struct SyncReconciler {
    store: Arc<dyn RecordStore>,
    remote: Option<RemoteClient>,
    upload_lock: Mutex<()>,
}

impl SyncReconciler {
    /// `remote` is `None` when no cloud credentials are configured.
    pub fn new(store: Arc<dyn RecordStore>, remote: Option<RemoteClient>) -> Self {
        Self {
            store,
            remote,
            upload_lock: Mutex::new(()),
        }
    }

    pub fn remote(&self) -> Option<&RemoteClient> {
        self.remote.as_ref()
    }

    /// Upload every record that has never been synced or changed since its
    /// last upload. Records still awaiting enrichment are skipped.
    ///
    /// One failing record never aborts the others.
    #[instrument(skip(self), fields(subsystem = "client", component = "sync", op = "upload_all"))]
    pub async fn upload_all(&self) -> Result<UploadOutcome> {
        let _running = self.upload_lock.lock().await;
        let start = Instant::now();

        let eligible: Vec<(Record, SyncAction)> = self
            .store
            .load()
            .await?
            .into_iter()
            .filter_map(|record| record.sync_action().map(|action| (record, action)))
            .collect();

        if eligible.is_empty() {
            debug!("Nothing to upload");
            return Ok(UploadOutcome::NothingToUpload);
        }

        let remote = self.remote.as_ref().ok_or_else(|| {
            Error::Config("cloud URL and token are not configured".to_string())
        })?;
        remote.ensure_compatible().await?;

        let results = join_all(eligible.into_iter().map(|(record, action)| async move {
            let result = match (action, record.cloud_id()) {
                (SyncAction::Reupload, Some(cloud_id)) => {
                    remote.update(cloud_id, &record.title, &record.tags).await
                }
                _ => remote.insert(&InsertRequest::from_record(&record)).await,
            };
            (record, result)
        }))
        .await;

        let mut report = UploadReport::default();
        let mut accepted = Vec::new();
        for (record, result) in results {
            match result {
                Ok(cloud_id) => accepted.push((record, cloud_id)),
                Err(e) => {
                    warn!(record_id = %record.id, error = %e, "Upload failed");
                    report.failed.push((record.id, e));
                }
            }
        }

        let mut orphans: Vec<String> = Vec::new();
        let mut conflicts: Vec<(String, Error)> = Vec::new();
        self.store
            .update(&mut |records| {
                orphans.clear();
                conflicts.clear();
                for (uploaded, cloud_id) in &accepted {
                    let Some(current) = records.iter_mut().find(|r| r.id == uploaded.id) else {
                        if uploaded.cloud_id().is_none() {
                            orphans.push(cloud_id.clone());
                        }
                        continue;
                    };
                    let content_current = current.same_content(uploaded);
                    if let Err(e) = current.record_upload(cloud_id, content_current) {
                        conflicts.push((uploaded.id.clone(), e));
                    }
                }
                Ok(())
            })
            .await?;

        for (record, _) in &accepted {
            if !conflicts.iter().any(|(id, _)| id == &record.id) {
                report.uploaded.push(record.id.clone());
            }
        }
        report.failed.append(&mut conflicts);

        // Records deleted locally while their first upload was in flight.
        for cloud_id in orphans {
            if let Err(e) = remote.remove(&cloud_id).await {
                warn!(cloud_id = %cloud_id, error = %e, "Failed to remove orphaned remote copy");
            }
        }

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Upload finished"
        );
        Ok(UploadOutcome::Completed(report))
    }

    /// Remove one record, remote copy first.
    ///
    /// If the remote store says the record is not ours (`NotFound`), nothing
    /// is deleted and the error is returned. Any other remote problem
    /// (no credentials, rejected token, network failure) still deletes the
    /// local copy and reports a warning.
    pub async fn remove(&self, record_id: &str) -> Result<RemovalOutcome> {
        self.remove_with(record_id, false).await
    }

    /// Like [`remove`](Self::remove), but a remote `NotFound` also deletes
    /// the local copy, with a warning. For records whose remote copy is gone
    /// (server reset, token of another tenant).
    pub async fn force_remove(&self, record_id: &str) -> Result<RemovalOutcome> {
        self.remove_with(record_id, true).await
    }

    #[instrument(skip(self), fields(subsystem = "client", component = "sync", op = "remove"))]
    async fn remove_with(&self, record_id: &str, force: bool) -> Result<RemovalOutcome> {
        let record = self
            .store
            .load()
            .await?
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::InvalidInput(format!("no local record with id {}", record_id)))?;

        let outcome = match (record.cloud_id(), &self.remote) {
            (None, _) => RemovalOutcome::Removed,
            (Some(_), None) => RemovalOutcome::RemovedLocally {
                warning: "cloud URL or token not configured; remote copy kept".to_string(),
            },
            (Some(cloud_id), Some(remote)) => match remote.remove(cloud_id).await {
                Ok(()) => RemovalOutcome::Removed,
                Err(e @ Error::NotFound(_)) if force => RemovalOutcome::RemovedLocally {
                    warning: format!("remote store does not hold this record ({}); removed locally", e),
                },
                Err(e @ Error::NotFound(_)) => {
                    warn!(record_id = %record_id, cloud_id = %cloud_id, "Remote store does not own this record; keeping it");
                    return Err(e);
                }
                Err(e) => RemovalOutcome::RemovedLocally {
                    warning: format!("failed to remove from cloud: {}", e),
                },
            },
        };

        self.store.delete_by_id(record_id).await?;
        if let RemovalOutcome::RemovedLocally { warning } = &outcome {
            warn!(record_id = %record_id, warning = %warning, "Removed locally only");
        }
        Ok(outcome)
    }

    /// Remove every record, each with the policy of [`remove`](Self::remove).
    pub async fn remove_all(&self) -> Result<RemovalReport> {
        let ids: Vec<String> = self.store.load().await?.into_iter().map(|r| r.id).collect();
        let results = join_all(ids.into_iter().map(|id| async move {
            let result = self.remove(&id).await;
            (id, result)
        }))
        .await;

        let mut report = RemovalReport::default();
        for (id, result) in results {
            match result {
                Ok(RemovalOutcome::Removed) => report.removed.push(id),
                Ok(RemovalOutcome::RemovedLocally { warning }) => report.warnings.push((id, warning)),
                Err(e) => report.failed.push((id, e)),
            }
        }
        Ok(report)
    }
}
