//! Repository and backend traits implemented by the other scaffold crates.

use async_trait::async_trait;

use crate::models::{Asset, Enrichment, Record};
use crate::Result;

// =============================================================================
// TOKEN STORE
// =============================================================================

/// Bearer token to tenant mapping used by the remote store.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Mint and persist a fresh token for `user_id`.
    async fn issue(&self, user_id: &str) -> Result<String>;

    /// Tenant id the token belongs to, if the token is live.
    async fn resolve(&self, token: &str) -> Result<Option<String>>;

    /// Delete a token. `NotFound` if it does not exist.
    async fn revoke(&self, token: &str) -> Result<()>;

    /// Number of live tokens.
    async fn count(&self) -> Result<i64>;
}

// =============================================================================
// LOCAL RECORD STORE
// =============================================================================

/// Device-local ordered list of records.
///
/// Every mutation is an atomic read-modify-write: concurrent callers never
/// lose each other's updates.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current list, in display order. Empty if nothing is persisted yet.
    async fn load(&self) -> Result<Vec<Record>>;

    /// Overwrite the whole list.
    async fn replace_all(&self, records: Vec<Record>) -> Result<()>;

    /// Prepend a record. `InvalidInput` if the id is already present.
    async fn insert_front(&self, record: Record) -> Result<()>;

    /// Apply `patch` to the record with `id`. Returns false when no record matched.
    async fn patch_by_id(
        &self,
        id: &str,
        patch: &mut (dyn for<'r> FnMut(&'r mut Record) + Send),
    ) -> Result<bool>;

    /// Remove the record with `id`. Returns false when no record matched.
    async fn delete_by_id(&self, id: &str) -> Result<bool>;

    /// General read-modify-write over the full list.
    ///
    /// If `f` returns an error nothing is written.
    async fn update(
        &self,
        f: &mut (dyn for<'r> FnMut(&'r mut Vec<Record>) -> Result<()> + Send),
    ) -> Result<()>;

    /// Remove every record.
    async fn clear(&self) -> Result<()> {
        self.replace_all(Vec::new()).await
    }
}

// =============================================================================
// DESCRIBE FUNCTION
// =============================================================================

/// AI model boundary: an asset in, a title and tags out.
#[async_trait]
pub trait DescribeBackend: Send + Sync {
    async fn describe(&self, asset: &Asset) -> Result<Enrichment>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

// =============================================================================
// SECRETS
// =============================================================================

/// Well-known secret keys on the device.
pub mod secret_keys {
    /// Credential for the describe backend, if it needs one.
    pub const API_KEY: &str = "API_KEY";
    /// Bearer token for the remote store.
    pub const CLOUD_TOKEN: &str = "CLOUD_TOKEN";
    /// Base URL of the remote store.
    pub const CLOUD_URL: &str = "CLOUD_URL";
}

/// Key/value credential storage on the device.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}
