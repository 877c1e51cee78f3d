//! Typo-tolerant matching over local records.
//!
//! Similarity is `similar`'s character diff ratio (0.0 disjoint, 1.0 equal).
//! Each query word is compared to every word of a record's title and tags;
//! a record matches when the average best similarity over the query words
//! reaches `1.0 - threshold`.

use similar::TextDiff;

use scaffold_core::defaults::FUZZY_THRESHOLD;
use scaffold_core::Record;

use crate::index::tokenize;

/// Shortest query word that counts as a full match when it appears inside a word.
const MIN_SUBSTRING_CHARS: usize = 3;

/// Fuzzy matcher with a distance threshold (0.0 exact, 1.0 anything).
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: f32,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(FUZZY_THRESHOLD)
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Similarity of two words.
    pub fn similarity(a: &str, b: &str) -> f32 {
        if a == b {
            return 1.0;
        }
        if a.chars().count() >= MIN_SUBSTRING_CHARS && b.contains(a) {
            return 1.0;
        }
        TextDiff::from_chars(a, b).ratio()
    }

    /// Score of `query` against a set of text fields, in `[0, 1]`.
    pub fn score(&self, query: &str, fields: &[&str]) -> f32 {
        let query_words = tokenize(query);
        if query_words.is_empty() {
            return 0.0;
        }
        let field_words: Vec<String> = fields.iter().flat_map(|f| tokenize(f)).collect();
        if field_words.is_empty() {
            return 0.0;
        }

        let total: f32 = query_words
            .iter()
            .map(|q| {
                field_words
                    .iter()
                    .map(|w| Self::similarity(q, w))
                    .fold(0.0_f32, f32::max)
            })
            .sum();
        total / query_words.len() as f32
    }

    pub fn matches(&self, query: &str, fields: &[&str]) -> bool {
        self.score(query, fields) >= 1.0 - self.threshold
    }

    fn record_score(&self, query: &str, record: &Record) -> f32 {
        let mut fields: Vec<&str> = Vec::with_capacity(record.tags.len() + 1);
        fields.push(&record.title);
        fields.extend(record.tags.iter().map(String::as_str));
        self.score(query, &fields)
    }

    /// Records whose title or tags match `query`, best match first.
    ///
    /// Ties keep list order. An empty query returns every record.
    pub fn filter(&self, query: &str, records: &[Record]) -> Vec<Record> {
        if query.trim().is_empty() {
            return records.to_vec();
        }
        let mut scored: Vec<(f32, &Record)> = records
            .iter()
            .map(|r| (self.record_score(query, r), r))
            .filter(|(score, _)| *score >= 1.0 - self.threshold)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(_, r)| r.clone()).collect()
    }
}

/// Records carrying `tag` exactly.
pub fn filter_by_tag(records: &[Record], tag: &str) -> Vec<Record> {
    records.iter().filter(|r| r.has_tag(tag)).cloned().collect()
}
