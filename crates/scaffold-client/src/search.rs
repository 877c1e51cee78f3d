//! Search delegation: remote ranked search when possible, local fuzzy
//! matching otherwise.

use std::sync::Arc;

use tracing::{debug, warn};

use scaffold_core::{Record, RecordStore, RemoteRecord, Result};
use scaffold_search::{filter_by_tag, FuzzyMatcher};

use crate::remote::RemoteClient;

/// A remote hit, joined with the local record that was uploaded as it.
#[derive(Debug, Clone)]
pub struct RemoteHit {
    pub remote: RemoteRecord,
    pub local: Option<Record>,
}

#[derive(Debug, Clone)]
pub enum SearchResults {
    /// Ranked by the remote store.
    Remote(Vec<RemoteHit>),
    /// Matched on the device (no credentials, remote failure, or empty query).
    Local(Vec<Record>),
}

impl SearchResults {
    pub fn len(&self) -> usize {
        match self {
            SearchResults::Remote(hits) => hits.len(),
            SearchResults::Local(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SearchResults::Remote(_))
    }
}

pub struct SearchService {
    store: Arc<dyn RecordStore>,
    remote: Option<RemoteClient>,
    matcher: FuzzyMatcher,
}

impl SearchService {
    pub fn new(store: Arc<dyn RecordStore>, remote: Option<RemoteClient>) -> Self {
        Self {
            store,
            remote,
            matcher: FuzzyMatcher::default(),
        }
    }

    pub fn with_matcher(mut self, matcher: FuzzyMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Free-text search. An empty query lists everything.
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let query = query.trim();
        let records = self.store.load().await?;
        if query.is_empty() {
            return Ok(SearchResults::Local(records));
        }

        if let Some(remote) = &self.remote {
            match remote.query(query).await {
                Ok(hits) => {
                    debug!(subsystem = "client", component = "search", query = %query, result_count = hits.len(), "Remote search");
                    let hits = hits
                        .into_iter()
                        .map(|remote| RemoteHit {
                            local: records
                                .iter()
                                .find(|r| r.cloud_id() == Some(remote.id.as_str()))
                                .cloned(),
                            remote,
                        })
                        .collect();
                    return Ok(SearchResults::Remote(hits));
                }
                Err(e) => {
                    warn!(subsystem = "client", component = "search", error = %e, "Remote search failed, matching locally");
                }
            }
        }

        Ok(SearchResults::Local(self.matcher.filter(query, &records)))
    }

    /// Records carrying exactly `tag`. Always local.
    pub async fn filter_by_tag(&self, tag: &str) -> Result<Vec<Record>> {
        Ok(filter_by_tag(&self.store.load().await?, tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaffold_core::Enrichment;
    use scaffold_db::MemoryRecordStore;

    fn tagged(id: &str, title: &str, tags: &[&str]) -> Record {
        let mut record = Record::new_link(id, format!("https://example.com/{}", id));
        record.apply_enrichment(&Enrichment {
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        });
        record
    }

    fn service() -> SearchService {
        let store = MemoryRecordStore::with_records(vec![
            tagged("a", "bowl of penne", &["pasta", "food"]),
            tagged("b", "red running shoes", &["shoes"]),
        ]);
        SearchService::new(Arc::new(store), None)
    }

    #[tokio::test]
    async fn test_local_search_tolerates_typos() {
        let results = service().search("runing shoe").await.unwrap();
        let SearchResults::Local(records) = results else {
            panic!("expected local results");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "b");
    }

    #[tokio::test]
    async fn test_empty_query_lists_everything() {
        let results = service().search("").await.unwrap();
        assert!(!results.is_remote());
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_tag_filter_is_exact() {
        let service = service();
        assert_eq!(service.filter_by_tag("food").await.unwrap().len(), 1);
        assert!(service.filter_by_tag("foo").await.unwrap().is_empty());
    }
}
