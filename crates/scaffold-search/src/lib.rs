//! # scaffold-search
//!
//! Text search for scaffold.
//!
//! This crate provides:
//! - A serializable BM25 index with term and prefix matching (`index`), used
//!   by the remote store
//! - Typo-tolerant fuzzy matching over local records (`fuzzy`), used by the
//!   device when the remote store is unavailable
//!
//! ## Example
//!
//! ```ignore
//! use scaffold_search::{FuzzyMatcher, TextIndex};
//!
//! let mut index = TextIndex::new();
//! index.insert(record);
//! let hits = index.search("penne");
//!
//! let local = FuzzyMatcher::default().filter("pene", &records);
//! ```

pub mod fuzzy;
pub mod index;

pub use fuzzy::{filter_by_tag, FuzzyMatcher};
pub use index::{tokenize, ScoredRecord, TextIndex};
