//! # scaffold-core
//!
//! Core types, traits, and abstractions for scaffold.
//!
//! This crate provides the record model shared by the device and the remote
//! store, the wire types spoken between them, the error taxonomy, and the
//! repository/backend traits the other crates implement.

pub mod defaults;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use ids::{generate_id, generate_id_with};
pub use models::*;
pub use traits::*;

/// Protocol version a client built from this workspace expects the server to report.
///
/// Compared by strict string equality; there is no range negotiation.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
