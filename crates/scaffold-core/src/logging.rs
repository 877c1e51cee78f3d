//! Structured logging field names for scaffold.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log output from the device and the server can be queried by the same
//! keys.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, fallback applied (enrichment failed, remote delete skipped) |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration (search hits, merge steps) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "db", "search", "inference", "jobs", "client"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "tokens", "index", "records", "pipeline", "sync"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "insert", "upload_all", "dispatch", "issue"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Local record id.
pub const RECORD_ID: &str = "record_id";

/// Remote (server-assigned) record id.
pub const CLOUD_ID: &str = "cloud_id";

/// Tenant id a token resolved to.
pub const OWNER: &str = "owner";

/// Search query text.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search.
pub const RESULT_COUNT: &str = "result_count";

/// Number of records considered by a batch operation.
pub const RECORD_COUNT: &str = "record_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
