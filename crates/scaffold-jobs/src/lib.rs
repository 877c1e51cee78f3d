//! # scaffold-jobs
//!
//! Background enrichment for scaffold.
//!
//! This crate provides:
//! - Fire-and-forget enrichment of newly created records
//! - Completion handles for callers that want to wait
//! - Lifecycle notifications via broadcast channels
//! - A concurrency limit and a per-call timeout
//!
//! ## Example
//!
//! ```ignore
//! use scaffold_jobs::{EnrichmentConfig, EnrichmentPipeline};
//!
//! let pipeline = EnrichmentPipeline::new(store, backend, EnrichmentConfig::from_env());
//! let mut events = pipeline.events();
//!
//! store.insert_front(record).await?;
//! let handle = pipeline.dispatch(&record_id, asset)?;
//!
//! // Tests and the CLI may wait; the UI never does.
//! let outcome = handle.wait().await;
//! ```

pub mod pipeline;

// Re-export core types
pub use scaffold_core::*;

pub use pipeline::{
    EnrichmentConfig, EnrichmentEvent, EnrichmentHandle, EnrichmentOutcome, EnrichmentPipeline,
};
