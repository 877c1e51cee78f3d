//! The device-side collection: the operations a user performs, wired to the
//! local store, the enrichment pipeline, the secret store and the remote
//! store.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use reqwest::Url;
use tracing::{info, warn};

use scaffold_core::defaults::IMAGES_DIR;
use scaffold_core::{
    generate_id, Asset, Error, Record, RecordStore, Result, SecretStore,
};
use scaffold_db::JsonRecordStore;
use scaffold_jobs::{EnrichmentHandle, EnrichmentPipeline};

use crate::config::ClientConfig;
use crate::remote::RemoteClient;
use crate::search::{SearchResults, SearchService};
use crate::secrets::FileSecretStore;
use crate::sync::{RemovalOutcome, RemovalReport, SyncReconciler, UploadOutcome};

fn has_scheme() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^https?://").expect("static regex"))
}

/// User-facing result of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub ok: bool,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl From<&Error> for Notice {
    fn from(e: &Error) -> Self {
        Notice::failure(e.to_string())
    }
}

/// A record that was just created.
pub struct Added {
    pub record: Record,
    pub notice: Notice,
    /// Background enrichment, if one was dispatched.
    pub enrichment: Option<EnrichmentHandle>,
}

pub struct Collection {
    config: ClientConfig,
    store: Arc<dyn RecordStore>,
    secrets: Arc<dyn SecretStore>,
    pipeline: Option<EnrichmentPipeline>,
}

impl Collection {
    /// Collection over the JSON record file and secrets file in the config's data dir.
    ///
    /// Without a pipeline new records keep the "needs tagging" sentinel.
    pub fn open(
        config: ClientConfig,
        pipeline: impl FnOnce(Arc<dyn RecordStore>) -> Option<EnrichmentPipeline>,
    ) -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(JsonRecordStore::new(&config.data_dir));
        let secrets: Arc<dyn SecretStore> = Arc::new(FileSecretStore::new(&config.data_dir));
        let pipeline = pipeline(store.clone());
        Self {
            config,
            store,
            secrets,
            pipeline,
        }
    }

    pub fn with_parts(
        config: ClientConfig,
        store: Arc<dyn RecordStore>,
        secrets: Arc<dyn SecretStore>,
        pipeline: Option<EnrichmentPipeline>,
    ) -> Self {
        Self {
            config,
            store,
            secrets,
            pipeline,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn secrets(&self) -> &Arc<dyn SecretStore> {
        &self.secrets
    }

    pub async fn list(&self) -> Result<Vec<Record>> {
        self.store.load().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.store.load().await?.into_iter().find(|r| r.id == id))
    }

    async fn fresh_id(&self, seed: &str) -> Result<String> {
        let existing: HashSet<String> = self.store.load().await?.into_iter().map(|r| r.id).collect();
        Ok(generate_id(seed, &existing))
    }

    /// Copy an image into the collection and schedule its enrichment.
    pub async fn add_image(&self, source: &Path) -> Result<Added> {
        let data = tokio::fs::read(source).await?;
        let id = self.fresh_id(&source.to_string_lossy()).await?;
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "jpg".to_string());

        let images_dir = self.config.data_dir.join(IMAGES_DIR);
        tokio::fs::create_dir_all(&images_dir).await?;
        let destination = images_dir.join(format!("{}.{}", id, extension));
        tokio::fs::write(&destination, &data).await?;
        let uri = file_uri(&destination).await?;

        let record = Record::new_image(&id, uri);
        if let Err(e) = self.store.insert_front(record.clone()).await {
            let _ = tokio::fs::remove_file(&destination).await;
            return Err(e);
        }
        info!(subsystem = "client", op = "add_image", record_id = %id, "Image added");

        let asset = Asset::Image {
            data,
            mime_type: mime_type(&extension).to_string(),
        };
        Ok(self.finish_add(record, asset, "Image added successfully!"))
    }

    /// Add a web link. A missing scheme is taken to mean `https://`.
    pub async fn add_link(
        &self,
        input: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Added> {
        let url = normalize_link(input)?;
        let id = self.fresh_id(&url).await?;
        let record = Record::new_link(&id, &url);
        self.store.insert_front(record.clone()).await?;
        info!(subsystem = "client", op = "add_link", record_id = %id, url = %url, "Link added");

        let asset = Asset::Page {
            url,
            title,
            description,
        };
        Ok(self.finish_add(record, asset, "Link added successfully!"))
    }

    fn finish_add(&self, record: Record, asset: Asset, message: &str) -> Added {
        let Some(pipeline) = &self.pipeline else {
            return Added {
                record,
                notice: Notice::failure("Added, but no describe backend is configured"),
                enrichment: None,
            };
        };
        match pipeline.dispatch(&record.id, asset) {
            Ok(handle) => Added {
                record,
                notice: Notice::success(message),
                enrichment: Some(handle),
            },
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Enrichment not dispatched");
                Added {
                    record,
                    notice: Notice::success(message),
                    enrichment: None,
                }
            }
        }
    }

    /// Change title and/or tags. An uploaded record becomes pending re-sync.
    pub async fn edit(
        &self,
        id: &str,
        title: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Result<Notice> {
        let mut edit = Some((title, tags));
        let found = self
            .store
            .patch_by_id(id, &mut |record| {
                if let Some((title, tags)) = edit.take() {
                    record.edit(title, tags);
                }
            })
            .await?;
        Ok(if found {
            Notice::success("Record updated")
        } else {
            Notice::failure(format!("No record with id {}", id))
        })
    }

    /// Forget every local record and copied image. The remote store is not touched.
    pub async fn clear_all(&self) -> Result<Notice> {
        self.store.clear().await?;
        match tokio::fs::remove_dir_all(self.config.data_dir.join(IMAGES_DIR)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(subsystem = "client", op = "clear_all", "Local collection cleared");
        Ok(Notice::success("All images cleared"))
    }

    /// Remote client from the stored credentials, if both are set.
    pub async fn remote(&self) -> Result<Option<RemoteClient>> {
        RemoteClient::from_secrets(self.secrets.as_ref(), self.config.timeout_secs).await
    }

    async fn reconciler(&self) -> Result<SyncReconciler> {
        Ok(SyncReconciler::new(self.store.clone(), self.remote().await?))
    }

    pub async fn sync(&self) -> Result<UploadOutcome> {
        self.reconciler().await?.upload_all().await
    }

    /// Remove one record, remote copy first. Returns the outcome and the
    /// matching notice.
    ///
    /// With `force`, a remote store that does not hold the record no longer
    /// blocks the local deletion.
    pub async fn remove(&self, id: &str, force: bool) -> Result<(RemovalOutcome, Notice)> {
        let reconciler = self.reconciler().await?;
        let outcome = if force {
            reconciler.force_remove(id).await?
        } else {
            reconciler.remove(id).await?
        };
        let notice = match &outcome {
            RemovalOutcome::Removed => Notice::success("Image removed"),
            RemovalOutcome::RemovedLocally { warning } => Notice::failure(warning.clone()),
        };
        self.remove_image_file(id).await;
        Ok((outcome, notice))
    }

    pub async fn remove_all(&self) -> Result<RemovalReport> {
        let report = self.reconciler().await?.remove_all().await?;
        for id in report.removed.iter().chain(report.warnings.iter().map(|(id, _)| id)) {
            self.remove_image_file(id).await;
        }
        Ok(report)
    }

    async fn remove_image_file(&self, id: &str) {
        let dir = self.config.data_dir.join(IMAGES_DIR);
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(id) {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "Failed to delete image file");
                }
            }
        }
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        SearchService::new(self.store.clone(), self.remote().await?)
            .search(query)
            .await
    }

    pub async fn filter_by_tag(&self, tag: &str) -> Result<Vec<Record>> {
        SearchService::new(self.store.clone(), None)
            .filter_by_tag(tag)
            .await
    }
}

/// Add `https://` when no http(s) scheme is present, then validate.
pub fn normalize_link(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("link is empty".to_string()));
    }
    let candidate = if has_scheme().is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| Error::InvalidInput(format!("invalid link {:?}: {}", input, e)))?;
    if url.host_str().is_none() {
        return Err(Error::InvalidInput(format!("link {:?} has no host", input)));
    }
    Ok(url.to_string())
}

fn mime_type(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

async fn file_uri(path: &Path) -> Result<String> {
    let absolute = tokio::fs::canonicalize(path).await?;
    Ok(format!("file://{}", absolute.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_link_adds_scheme() {
        assert_eq!(normalize_link("bun.sh").unwrap(), "https://bun.sh/");
        assert_eq!(normalize_link("  http://example.com/a ").unwrap(), "http://example.com/a");
        assert_eq!(normalize_link("HTTPS://Example.com").unwrap(), "https://example.com/");
    }

    #[test]
    fn test_normalize_link_rejects_garbage() {
        assert!(matches!(normalize_link(""), Err(Error::InvalidInput(_))));
        assert!(matches!(normalize_link("   "), Err(Error::InvalidInput(_))));
        assert!(matches!(normalize_link("http://"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type("png"), "image/png");
        assert_eq!(mime_type("jpeg"), "image/jpeg");
        assert_eq!(mime_type("bin"), "application/octet-stream");
    }

    #[test]
    fn test_notice_from_error() {
        let notice = Notice::from(&Error::Unauthorized("bad token".to_string()));
        assert!(!notice.ok);
        assert!(notice.message.contains("bad token"));
    }
}
