//! # scaffold-client
//!
//! The device side of scaffold: an offline-first record collection with
//! background enrichment, remote sync and search.
//!
//! - [`collection`]: user operations (add, edit, remove, sync, search)
//! - [`sync`]: upload reconciliation and remote-first removal
//! - [`search`]: remote search with local fuzzy fallback
//! - [`remote`]: HTTP client for the remote store
//! - [`secrets`]: file-backed credential store
//! - [`config`]: environment configuration

pub mod collection;
pub mod config;
pub mod remote;
pub mod search;
pub mod secrets;
pub mod sync;

pub use scaffold_core::*;

pub use collection::{normalize_link, Added, Collection, Notice};
pub use config::ClientConfig;
pub use remote::RemoteClient;
pub use search::{RemoteHit, SearchResults, SearchService};
pub use secrets::FileSecretStore;
pub use sync::{RemovalOutcome, RemovalReport, SyncReconciler, UploadOutcome, UploadReport};
