//! # scaffold-inference
//!
//! Describe backends for scaffold: an image or a web page goes in, a short
//! title and up to five tags come out.
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable the Ollama-compatible backend
//! - `mock`: Export [`mock::MockDescribeBackend`] for downstream tests
//!
//! # Example
//!
//! ```rust,no_run
//! use scaffold_inference::{Asset, DescribeBackend, OllamaDescribeBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaDescribeBackend::from_env();
//!     let asset = Asset::Page {
//!         url: "https://bun.sh".to_string(),
//!         title: None,
//!         description: None,
//!     };
//!     let enrichment = backend.describe(&asset).await.unwrap();
//!     println!("{} {:?}", enrichment.title, enrichment.tags);
//! }
//! ```

pub mod parse;
pub mod prompts;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use scaffold_core::*;

#[cfg(feature = "ollama")]
pub use ollama::OllamaDescribeBackend;

pub use parse::parse_enrichment;
