//! Record model, sync state, and the wire types shared by device and server.

use serde::{Deserialize, Serialize};

use crate::defaults::{MAX_TAGS, NEEDS_TAGGING_TAG};
use crate::{Error, Result};

// =============================================================================
// SYNC STATE
// =============================================================================

/// Where a record stands relative to its remote counterpart.
///
/// Persisted as the tri-state `needsSyncing` flag: absent, `true`, `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Never uploaded (`needsSyncing` absent).
    #[default]
    NeverSynced,
    /// Uploaded once, changed locally since (`needsSyncing: true`).
    PendingResync,
    /// Remote copy matches local (`needsSyncing: false`).
    Synced,
}

impl SyncState {
    /// Decode the persisted tri-state flag.
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => SyncState::NeverSynced,
            Some(true) => SyncState::PendingResync,
            Some(false) => SyncState::Synced,
        }
    }

    /// Encode as the persisted tri-state flag.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            SyncState::NeverSynced => None,
            SyncState::PendingResync => Some(true),
            SyncState::Synced => Some(false),
        }
    }
}

/// What the reconciler has to do for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// First upload; the server assigns a cloud id.
    Upload,
    /// Re-upload of an edited record under its existing cloud id.
    Reupload,
}

// =============================================================================
// RECORD
// =============================================================================

/// Where the collected item lives: a local image file or a web link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    Image { uri: String },
    Link { url: String },
}

/// A collected image or link on the device.
///
/// Sync bookkeeping is private so that `cloud_id` can only go from absent to
/// present and the sync state can never fall back to `NeverSynced`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr", into = "RecordRepr")]
pub struct Record {
    pub id: String,
    pub source: RecordSource,
    pub title: String,
    pub tags: Vec<String>,
    sync: SyncState,
    cloud_id: Option<String>,
}

/// On-disk JSON layout of a record.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordRepr {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    title: String,
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    needs_syncing: Option<bool>,
    #[serde(rename = "cloudID", default, skip_serializing_if = "Option::is_none")]
    cloud_id: Option<String>,
}

impl TryFrom<RecordRepr> for Record {
    type Error = String;

    fn try_from(repr: RecordRepr) -> std::result::Result<Self, Self::Error> {
        let source = match (repr.uri, repr.url) {
            (Some(uri), None) => RecordSource::Image { uri },
            (None, Some(url)) => RecordSource::Link { url },
            (Some(_), Some(_)) => {
                return Err(format!("record {} has both uri and url", repr.id));
            }
            (None, None) => {
                return Err(format!("record {} has neither uri nor url", repr.id));
            }
        };
        Ok(Record {
            id: repr.id,
            source,
            title: repr.title,
            tags: repr.tags,
            sync: SyncState::from_flag(repr.needs_syncing),
            cloud_id: repr.cloud_id,
        })
    }
}

impl From<Record> for RecordRepr {
    fn from(record: Record) -> Self {
        let (uri, url) = match record.source {
            RecordSource::Image { uri } => (Some(uri), None),
            RecordSource::Link { url } => (None, Some(url)),
        };
        RecordRepr {
            id: record.id,
            uri,
            url,
            title: record.title,
            tags: record.tags,
            needs_syncing: record.sync.as_flag(),
            cloud_id: record.cloud_id,
        }
    }
}

impl Record {
    /// Create a fresh, unenriched, never-synced record.
    pub fn new(id: impl Into<String>, source: RecordSource) -> Self {
        Self {
            id: id.into(),
            source,
            title: String::new(),
            tags: vec![NEEDS_TAGGING_TAG.to_string()],
            sync: SyncState::NeverSynced,
            cloud_id: None,
        }
    }

    pub fn new_image(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::new(id, RecordSource::Image { uri: uri.into() })
    }

    pub fn new_link(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(id, RecordSource::Link { url: url.into() })
    }

    pub fn uri(&self) -> Option<&str> {
        match &self.source {
            RecordSource::Image { uri } => Some(uri),
            RecordSource::Link { .. } => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.source {
            RecordSource::Link { url } => Some(url),
            RecordSource::Image { .. } => None,
        }
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    pub fn cloud_id(&self) -> Option<&str> {
        self.cloud_id.as_deref()
    }

    /// True while the record still carries only the enrichment sentinel tag.
    pub fn awaiting_enrichment(&self) -> bool {
        self.tags.len() == 1 && self.tags[0] == NEEDS_TAGGING_TAG
    }

    /// Literal tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Title and tags are what the remote copy holds.
    pub fn same_content(&self, other: &Record) -> bool {
        self.title == other.title && self.tags == other.tags
    }

    /// What the reconciler must do for this record, if anything.
    pub fn sync_action(&self) -> Option<SyncAction> {
        if self.awaiting_enrichment() {
            return None;
        }
        match self.sync {
            SyncState::NeverSynced => Some(SyncAction::Upload),
            SyncState::PendingResync if self.cloud_id.is_some() => Some(SyncAction::Reupload),
            SyncState::PendingResync => Some(SyncAction::Upload),
            SyncState::Synced => None,
        }
    }

    /// Replace title and tags with an enrichment result.
    pub fn apply_enrichment(&mut self, enrichment: &Enrichment) {
        self.set_content(enrichment.title.clone(), enrichment.tags.clone());
    }

    /// User edit of title and/or tags.
    pub fn edit(&mut self, title: Option<String>, tags: Option<Vec<String>>) {
        let title = title.unwrap_or_else(|| self.title.clone());
        let tags = tags.unwrap_or_else(|| self.tags.clone());
        self.set_content(title, tags);
    }

    fn set_content(&mut self, title: String, tags: Vec<String>) {
        if self.title == title && self.tags == tags {
            return;
        }
        self.title = title;
        self.tags = tags;
        if self.sync == SyncState::Synced {
            self.sync = SyncState::PendingResync;
        }
    }

    /// Record a successful upload.
    ///
    /// `content_current` is false when title/tags changed while the upload was
    /// in flight; the record then keeps the cloud id but stays pending.
    pub fn record_upload(&mut self, cloud_id: &str, content_current: bool) -> Result<()> {
        match &self.cloud_id {
            Some(existing) if existing != cloud_id => {
                return Err(Error::Internal(format!(
                    "record {} already has cloudID {}, refusing {}",
                    self.id, existing, cloud_id
                )));
            }
            Some(_) => {}
            None => self.cloud_id = Some(cloud_id.to_string()),
        }
        self.sync = if content_current {
            SyncState::Synced
        } else {
            SyncState::PendingResync
        };
        Ok(())
    }
}

// =============================================================================
// ENRICHMENT
// =============================================================================

/// Title and tags produced by the describe function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub title: String,
    pub tags: Vec<String>,
}

impl Enrichment {
    /// Trim fields, drop empty and duplicate tags, keep at most `MAX_TAGS`.
    pub fn normalized(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        let mut tags: Vec<String> = Vec::with_capacity(MAX_TAGS);
        for tag in self.tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
            if tags.len() == MAX_TAGS {
                break;
            }
        }
        if title.is_empty() && tags.is_empty() {
            return Err(Error::Upstream(
                "describe returned neither a title nor tags".to_string(),
            ));
        }
        Ok(Self { title, tags })
    }
}

/// Input handed to the describe function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    /// Raw image bytes.
    Image { data: Vec<u8>, mime_type: String },
    /// A web page, described from its address and whatever preview is known.
    Page {
        url: String,
        title: Option<String>,
        description: Option<String>,
    },
}

// =============================================================================
// REMOTE RECORD & WIRE TYPES
// =============================================================================

/// A record as held by the remote store, tagged with its owning tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Server-assigned cloud id.
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub owner: String,
}

/// `POST /query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// `POST /insert`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsertRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl InsertRequest {
    pub fn from_record(record: &Record) -> Self {
        Self {
            uri: record.uri().map(str::to_string),
            url: record.url().map(str::to_string),
            title: Some(record.title.clone()),
            tags: Some(record.tags.clone()),
        }
    }
}

/// `POST /update`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// `POST /remove` and `POST /get`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdRequest {
    #[serde(default)]
    pub id: Option<String>,
}

/// `POST /token/new`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenNewRequest {
    #[serde(rename = "userID", default)]
    pub user_id: Option<String>,
}

/// `POST /token/remove`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRemoveRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Success body carrying a cloud id (`/insert`, `/update`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {
    pub success: bool,
    #[serde(rename = "cloudID")]
    pub cloud_id: String,
}

/// Plain success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `POST /token/new` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenNewResponse {
    pub success: bool,
    pub token: String,
}

/// `GET /version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Uniform error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enriched(id: &str) -> Record {
        let mut record = Record::new_image(id, "file:///images/a.jpg");
        record.apply_enrichment(&Enrichment {
            title: "bowl of penne".to_string(),
            tags: vec!["pasta".to_string(), "food".to_string()],
        });
        record
    }

    #[test]
    fn test_new_record_is_unenriched_and_never_synced() {
        let record = Record::new_link("abc", "https://example.com");
        assert_eq!(record.title, "");
        assert_eq!(record.tags, vec![NEEDS_TAGGING_TAG.to_string()]);
        assert!(record.awaiting_enrichment());
        assert_eq!(record.sync_state(), SyncState::NeverSynced);
        assert_eq!(record.cloud_id(), None);
        assert_eq!(record.sync_action(), None);
    }

    #[test]
    fn test_serialized_layout_omits_absent_sync_fields() {
        let record = Record::new_image("abc", "file:///a.jpg");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"id": "abc", "uri": "file:///a.jpg", "title": "", "tags": ["needs tagging"]})
        );
    }

    #[test]
    fn test_tri_state_flag_round_trips() {
        let raw = json!([
            {"id": "a", "url": "https://a", "title": "t", "tags": ["x"]},
            {"id": "b", "url": "https://b", "title": "t", "tags": ["x"], "needsSyncing": true, "cloudID": "c1"},
            {"id": "c", "url": "https://c", "title": "t", "tags": ["x"], "needsSyncing": false, "cloudID": "c2"}
        ]);
        let records: Vec<Record> = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(records[0].sync_state(), SyncState::NeverSynced);
        assert_eq!(records[1].sync_state(), SyncState::PendingResync);
        assert_eq!(records[2].sync_state(), SyncState::Synced);
        assert_eq!(records[2].cloud_id(), Some("c2"));
        assert_eq!(serde_json::to_value(&records).unwrap(), raw);
    }

    #[test]
    fn test_both_uri_and_url_is_rejected() {
        let raw = json!({"id": "a", "uri": "file:///a", "url": "https://a", "title": "", "tags": []});
        let err = serde_json::from_value::<Record>(raw).unwrap_err();
        assert!(err.to_string().contains("both uri and url"));
    }

    #[test]
    fn test_neither_uri_nor_url_is_rejected() {
        let raw = json!({"id": "a", "title": "", "tags": []});
        assert!(serde_json::from_value::<Record>(raw).is_err());
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let enrichment = Enrichment {
            title: "bowl of penne".to_string(),
            tags: vec!["pasta".to_string()],
        };
        let mut once = Record::new_image("a", "file:///a.jpg");
        once.apply_enrichment(&enrichment);
        let mut twice = once.clone();
        twice.apply_enrichment(&enrichment);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sync_action_follows_state() {
        let mut record = enriched("a");
        assert_eq!(record.sync_action(), Some(SyncAction::Upload));

        record.record_upload("cloud-1", true).unwrap();
        assert_eq!(record.sync_state(), SyncState::Synced);
        assert_eq!(record.sync_action(), None);

        record.edit(Some("renamed".to_string()), None);
        assert_eq!(record.sync_state(), SyncState::PendingResync);
        assert_eq!(record.sync_action(), Some(SyncAction::Reupload));
    }

    #[test]
    fn test_edit_without_change_keeps_synced() {
        let mut record = enriched("a");
        record.record_upload("cloud-1", true).unwrap();
        let title = record.title.clone();
        record.edit(Some(title), None);
        assert_eq!(record.sync_state(), SyncState::Synced);
    }

    #[test]
    fn test_edit_before_first_sync_stays_never_synced() {
        let mut record = enriched("a");
        record.edit(Some("new".to_string()), None);
        assert_eq!(record.sync_state(), SyncState::NeverSynced);
    }

    #[test]
    fn test_cloud_id_never_changes() {
        let mut record = enriched("a");
        record.record_upload("cloud-1", true).unwrap();
        assert!(record.record_upload("cloud-2", true).is_err());
        assert_eq!(record.cloud_id(), Some("cloud-1"));

        record.edit(None, Some(vec!["other".to_string()]));
        record.record_upload("cloud-1", true).unwrap();
        assert_eq!(record.cloud_id(), Some("cloud-1"));
        assert_eq!(record.sync_state(), SyncState::Synced);
    }

    #[test]
    fn test_synced_never_regresses_to_never_synced() {
        let mut record = enriched("a");
        record.record_upload("cloud-1", true).unwrap();
        for _ in 0..3 {
            record.edit(Some("x".to_string()), None);
            record.apply_enrichment(&Enrichment {
                title: "y".to_string(),
                tags: vec!["z".to_string()],
            });
            assert_ne!(record.sync_state(), SyncState::NeverSynced);
        }
    }

    #[test]
    fn test_upload_with_stale_content_stays_pending() {
        let mut record = enriched("a");
        record.record_upload("cloud-1", false).unwrap();
        assert_eq!(record.cloud_id(), Some("cloud-1"));
        assert_eq!(record.sync_state(), SyncState::PendingResync);
    }

    #[test]
    fn test_enrichment_normalization() {
        let enrichment = Enrichment {
            title: "  red shoes ".to_string(),
            tags: vec![
                " red".to_string(),
                "".to_string(),
                "shoes".to_string(),
                "red".to_string(),
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
        }
        .normalized()
        .unwrap();
        assert_eq!(enrichment.title, "red shoes");
        assert_eq!(enrichment.tags, vec!["red", "shoes", "a", "b", "c"]);
    }

    #[test]
    fn test_empty_enrichment_is_upstream_failure() {
        let err = Enrichment {
            title: " ".to_string(),
            tags: vec![],
        }
        .normalized()
        .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_wire_field_names() {
        let resp = InsertResponse {
            success: true,
            cloud_id: "c1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(resp).unwrap(),
            json!({"success": true, "cloudID": "c1"})
        );

        let req: TokenNewRequest = serde_json::from_value(json!({"userID": "alice"})).unwrap();
        assert_eq!(req.user_id.as_deref(), Some("alice"));

        let req: InsertRequest = serde_json::from_value(json!({"title": "t"})).unwrap();
        assert!(req.tags.is_none());
    }
}
