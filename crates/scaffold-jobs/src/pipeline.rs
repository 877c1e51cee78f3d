//! Enrichment pipeline: describe a new record in the background and patch
//! its title and tags in place.
//!
//! A dispatch never blocks the caller. Failures leave the record with its
//! sentinel tag and are reported, not retried. A result that arrives after
//! the user edited the record is dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use scaffold_core::defaults::{ENRICH_MAX_CONCURRENT, ENRICH_TIMEOUT_SECS, EVENT_BUS_CAPACITY};
use scaffold_core::{Asset, DescribeBackend, Enrichment, Error, RecordStore, Result};

/// Configuration for the enrichment pipeline.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Maximum number of describe calls in flight.
    pub max_concurrent: usize,
    /// Timeout for a single describe call, in seconds.
    pub timeout_secs: u64,
    /// Whether enrichment runs at all.
    pub enabled: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrent: ENRICH_MAX_CONCURRENT,
            timeout_secs: ENRICH_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl EnrichmentConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ENRICH_ENABLED` | `true` | Enable/disable enrichment |
    /// | `ENRICH_MAX_CONCURRENT` | `2` | Max describe calls in flight |
    /// | `ENRICH_TIMEOUT_SECS` | `120` | Per-call timeout |
    pub fn from_env() -> Self {
        let enabled = std::env::var("ENRICH_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = std::env::var("ENRICH_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(ENRICH_MAX_CONCURRENT)
            .max(1);

        let timeout_secs = std::env::var("ENRICH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(ENRICH_TIMEOUT_SECS);

        Self {
            max_concurrent,
            timeout_secs,
            enabled,
        }
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentEvent {
    /// The describe call for a record started.
    Started { record_id: String },
    /// The record was patched with a title and tags.
    Completed { record_id: String, title: String },
    /// The describe call or the patch failed.
    Failed { record_id: String, error: String },
    /// The result was dropped: the record was deleted or already edited.
    Discarded { record_id: String },
}

/// Final result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    Enriched(Enrichment),
    Failed(String),
    /// The record no longer existed when the result arrived.
    RecordGone,
    /// The user edited the record first; their title and tags are kept.
    Superseded,
    /// Enrichment is switched off.
    Disabled,
}

impl EnrichmentOutcome {
    pub fn is_enriched(&self) -> bool {
        matches!(self, EnrichmentOutcome::Enriched(_))
    }
}

/// Handle to one background enrichment.
#[derive(Debug)]
pub struct EnrichmentHandle {
    record_id: String,
    task: JoinHandle<EnrichmentOutcome>,
}

impl EnrichmentHandle {
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the enrichment to settle.
    pub async fn wait(self) -> EnrichmentOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => EnrichmentOutcome::Failed(format!("enrichment task aborted: {}", e)),
        }
    }
}

/// Dispatches describe calls and patches their results into the record store.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    store: Arc<dyn RecordStore>,
    backend: Arc<dyn DescribeBackend>,
    config: EnrichmentConfig,
    permits: Arc<Semaphore>,
    /// Ids dispatched so far. Ids of deleted records are pruned, so the set
    /// never outgrows the record list.
    dispatched: Arc<Mutex<HashSet<String>>>,
    event_tx: broadcast::Sender<EnrichmentEvent>,
}

impl EnrichmentPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        backend: Arc<dyn DescribeBackend>,
        config: EnrichmentConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            store,
            backend,
            config,
            dispatched: Arc::new(Mutex::new(HashSet::new())),
            event_tx,
        }
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Get a receiver for pipeline events.
    pub fn events(&self) -> broadcast::Receiver<EnrichmentEvent> {
        self.event_tx.subscribe()
    }

    /// Schedule enrichment of `record_id` and return immediately.
    ///
    /// The record must already be in the store. A record is dispatched at
    /// most once per pipeline; a second dispatch is `InvalidInput`.
    pub fn dispatch(&self, record_id: &str, asset: Asset) -> Result<EnrichmentHandle> {
        {
            let mut dispatched = self
                .dispatched
                .lock()
                .map_err(|_| Error::Internal("dispatch set poisoned".to_string()))?;
            if !dispatched.insert(record_id.to_string()) {
                return Err(Error::InvalidInput(format!(
                    "enrichment already dispatched for {}",
                    record_id
                )));
            }
        }

        let record_id = record_id.to_string();
        if !self.config.enabled {
            debug!(subsystem = "jobs", component = "pipeline", record_id = %record_id, "Enrichment disabled");
            return Ok(EnrichmentHandle {
                record_id,
                task: tokio::spawn(async { EnrichmentOutcome::Disabled }),
            });
        }

        let pipeline = self.clone();
        let id = record_id.clone();
        let task = tokio::spawn(async move { pipeline.run(id, asset).await });
        Ok(EnrichmentHandle { record_id, task })
    }

    async fn run(self, record_id: String, asset: Asset) -> EnrichmentOutcome {
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return self.fail(&record_id, "pipeline shut down".to_string()),
        };

        let start = Instant::now();
        let _ = self.event_tx.send(EnrichmentEvent::Started {
            record_id: record_id.clone(),
        });
        debug!(
            subsystem = "jobs",
            component = "pipeline",
            op = "describe",
            record_id = %record_id,
            model = self.backend.model_name(),
            "Describing record"
        );

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let enrichment = match tokio::time::timeout(timeout, self.backend.describe(&asset)).await {
            Ok(Ok(enrichment)) => enrichment,
            Ok(Err(e)) => return self.fail(&record_id, e.to_string()),
            Err(_) => {
                return self.fail(
                    &record_id,
                    format!("describe exceeded timeout of {}s", self.config.timeout_secs),
                )
            }
        };

        // Only a record still in its creation state takes the result.
        let mut applied = false;
        let patched = self
            .store
            .patch_by_id(&record_id, &mut |record| {
                applied = record.awaiting_enrichment() && record.title.is_empty();
                if applied {
                    record.apply_enrichment(&enrichment);
                }
            })
            .await;

        match patched {
            Ok(true) if !applied => {
                debug!(subsystem = "jobs", component = "pipeline", record_id = %record_id, "Record edited before enrichment finished, result dropped");
                let _ = self.event_tx.send(EnrichmentEvent::Discarded { record_id });
                EnrichmentOutcome::Superseded
            }
            Ok(true) => {
                info!(
                    subsystem = "jobs",
                    component = "pipeline",
                    record_id = %record_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    tag_count = enrichment.tags.len(),
                    "Record enriched"
                );
                let _ = self.event_tx.send(EnrichmentEvent::Completed {
                    record_id,
                    title: enrichment.title.clone(),
                });
                EnrichmentOutcome::Enriched(enrichment)
            }
            Ok(false) => {
                debug!(subsystem = "jobs", component = "pipeline", record_id = %record_id, "Record deleted before enrichment finished");
                self.forget(&record_id);
                let _ = self.event_tx.send(EnrichmentEvent::Discarded { record_id });
                EnrichmentOutcome::RecordGone
            }
            Err(e) => self.fail(&record_id, e.to_string()),
        }
    }

    fn forget(&self, record_id: &str) {
        if let Ok(mut dispatched) = self.dispatched.lock() {
            dispatched.remove(record_id);
        }
    }

    /// Number of ids currently remembered as dispatched.
    pub fn dispatched_count(&self) -> usize {
        self.dispatched.lock().map(|d| d.len()).unwrap_or(0)
    }

    fn fail(&self, record_id: &str, error: String) -> EnrichmentOutcome {
        warn!(
            subsystem = "jobs",
            component = "pipeline",
            record_id = %record_id,
            error = %error,
            "Enrichment failed"
        );
        let _ = self.event_tx.send(EnrichmentEvent::Failed {
            record_id: record_id.to_string(),
            error: error.clone(),
        });
        EnrichmentOutcome::Failed(error)
    }
}
