//! Centralized default constants for scaffold.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// RECORDS
// =============================================================================

/// Sentinel tag a record carries until enrichment replaces its tags.
pub const NEEDS_TAGGING_TAG: &str = "needs tagging";

/// Maximum number of tags kept from an enrichment result.
pub const MAX_TAGS: usize = 5;

/// File name (the "well-known key") of the local record list inside the data dir.
pub const RECORDS_FILE: &str = "images.json";

/// Directory (inside the data dir) that holds copied image files.
pub const IMAGES_DIR: &str = "images";

/// File name of the device secret store inside the data dir.
pub const SECRETS_FILE: &str = "secrets.json";

// =============================================================================
// SEARCH
// =============================================================================

/// Fuzzy-match distance threshold (0.0 = exact, 1.0 = anything matches).
pub const FUZZY_THRESHOLD: f32 = 0.3;

/// BM25 term-frequency saturation.
pub const BM25_K1: f32 = 1.2;

/// BM25 length normalization.
pub const BM25_B: f32 = 0.75;

/// Boost applied to title matches relative to tag matches.
pub const TITLE_BOOST: f32 = 2.0;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 4221;

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default server data directory.
pub const SERVER_DATA_DIR: &str = "data";

/// Index snapshot file name inside the server data dir.
pub const INDEX_SNAPSHOT_FILE: &str = "index.json";

/// Token database file name inside the server data dir.
pub const TOKEN_DB_FILE: &str = "tokens.db";

/// Maximum request body size accepted by the server.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// CLIENT
// =============================================================================

/// Default device data directory (relative to the working directory).
pub const CLIENT_DATA_DIR: &str = ".scaffold";

/// Timeout for requests to the remote store (seconds).
pub const CLIENT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// ENRICHMENT
// =============================================================================

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Default vision-capable generation model.
pub const DESCRIBE_MODEL: &str = "llava";

/// Timeout for a single describe call (seconds).
pub const ENRICH_TIMEOUT_SECS: u64 = 120;

/// Maximum number of enrichments running at once.
pub const ENRICH_MAX_CONCURRENT: usize = 2;

/// Capacity of broadcast channels for pipeline events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

/// Master secret gating token administration routes.
pub const ENV_MASTER_TOKEN: &str = "MASTER_TOKEN";

/// Server data directory.
pub const ENV_DATA_DIR: &str = "DATA_DIR";

/// Device data directory.
pub const ENV_CLIENT_DATA_DIR: &str = "SCAFFOLD_DATA_DIR";

/// Ollama base URL.
pub const ENV_OLLAMA_URL: &str = "OLLAMA_URL";

/// Describe model override.
pub const ENV_DESCRIBE_MODEL: &str = "SCAFFOLD_DESCRIBE_MODEL";
