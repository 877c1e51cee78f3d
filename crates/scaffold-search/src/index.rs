//! In-memory BM25 index over remote records.
//!
//! Title and tag terms are indexed separately so title hits can be boosted.
//! Query terms match index terms exactly or as a prefix (a prefix hit counts
//! half). Only the documents are serialized; postings are rebuilt on load.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use serde::{Deserialize, Serialize};
use tracing::trace;

use scaffold_core::defaults::{BM25_B, BM25_K1, TITLE_BOOST};
use scaffold_core::RemoteRecord;

/// Weight of a prefix match relative to an exact term match.
const PREFIX_WEIGHT: f32 = 0.5;

/// Snapshot layout version.
const SNAPSHOT_VERSION: u32 = 1;

/// Split text into lowercase alphanumeric terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct TermFreq {
    title: u32,
    tags: u32,
}

impl TermFreq {
    fn weighted(self) -> f32 {
        self.title as f32 * TITLE_BOOST + self.tags as f32
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: RemoteRecord,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    version: u32,
    documents: Vec<RemoteRecord>,
}

/// Full-text index keyed by cloud id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "IndexSnapshot", into = "IndexSnapshot")]
pub struct TextIndex {
    documents: BTreeMap<String, RemoteRecord>,
    postings: BTreeMap<String, HashMap<String, TermFreq>>,
    doc_lengths: HashMap<String, u32>,
    total_length: u64,
}

impl From<IndexSnapshot> for TextIndex {
    fn from(snapshot: IndexSnapshot) -> Self {
        let mut index = TextIndex::new();
        for doc in snapshot.documents {
            index.insert(doc);
        }
        index
    }
}

impl From<TextIndex> for IndexSnapshot {
    fn from(index: TextIndex) -> Self {
        IndexSnapshot {
            version: SNAPSHOT_VERSION,
            documents: index.documents.into_values().collect(),
        }
    }
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&RemoteRecord> {
        self.documents.get(id)
    }

    /// Documents in id order.
    pub fn documents(&self) -> impl Iterator<Item = &RemoteRecord> {
        self.documents.values()
    }

    /// Add a document, replacing any existing document with the same id.
    /// Returns the replaced document.
    pub fn insert(&mut self, doc: RemoteRecord) -> Option<RemoteRecord> {
        let previous = self.remove(&doc.id);

        let title_terms = tokenize(&doc.title);
        let tag_terms: Vec<String> = doc.tags.iter().flat_map(|t| tokenize(t)).collect();
        let length = (title_terms.len() + tag_terms.len()) as u32;

        for term in title_terms {
            self.postings
                .entry(term)
                .or_default()
                .entry(doc.id.clone())
                .or_default()
                .title += 1;
        }
        for term in tag_terms {
            self.postings
                .entry(term)
                .or_default()
                .entry(doc.id.clone())
                .or_default()
                .tags += 1;
        }

        self.doc_lengths.insert(doc.id.clone(), length);
        self.total_length += u64::from(length);
        self.documents.insert(doc.id.clone(), doc);
        previous
    }

    /// Remove a document by id.
    pub fn remove(&mut self, id: &str) -> Option<RemoteRecord> {
        let doc = self.documents.remove(id)?;
        if let Some(length) = self.doc_lengths.remove(id) {
            self.total_length -= u64::from(length);
        }
        self.postings.retain(|_, docs| {
            docs.remove(id);
            !docs.is_empty()
        });
        Some(doc)
    }

    fn average_length(&self) -> f32 {
        if self.documents.is_empty() {
            return 1.0;
        }
        (self.total_length as f32 / self.documents.len() as f32).max(1.0)
    }

    fn idf(&self, doc_freq: usize) -> f32 {
        let n = self.documents.len() as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Rank documents matching any query term, best first.
    ///
    /// Ties are broken by id so results are deterministic.
    pub fn search(&self, query: &str) -> Vec<ScoredRecord> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let avg_len = self.average_length();
        let mut scores: HashMap<&str, f32> = HashMap::new();

        for query_term in &terms {
            let matching = self
                .postings
                .range::<str, _>((Bound::Included(query_term.as_str()), Bound::Unbounded))
                .take_while(|(term, _)| term.starts_with(query_term.as_str()));

            for (term, docs) in matching {
                let weight = if term == query_term { 1.0 } else { PREFIX_WEIGHT };
                let idf = self.idf(docs.len());
                for (doc_id, freq) in docs {
                    let tf = freq.weighted();
                    let len = self.doc_lengths.get(doc_id).copied().unwrap_or(0) as f32;
                    let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * len / avg_len);
                    let score = weight * idf * tf * (BM25_K1 + 1.0) / (tf + norm);
                    trace!(term = %term, doc_id = %doc_id, score, "bm25 term hit");
                    *scores.entry(doc_id.as_str()).or_insert(0.0) += score;
                }
            }
        }

        let mut results: Vec<ScoredRecord> = scores
            .into_iter()
            .filter_map(|(id, score)| {
                self.documents.get(id).map(|record| ScoredRecord {
                    record: record.clone(),
                    score,
                })
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        results
    }
}
