//! Mock describe backend for deterministic testing.
//!
//! ```rust,ignore
//! use scaffold_inference::mock::MockDescribeBackend;
//!
//! let backend = MockDescribeBackend::new().with_response("bowl of penne", &["pasta"]);
//! let enrichment = backend.describe(&asset).await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use scaffold_core::{Asset, DescribeBackend, Enrichment, Error, Result};

#[derive(Debug, Clone)]
enum Behavior {
    Respond(Enrichment),
    Fail(String),
}

/// Describe backend returning a canned answer.
#[derive(Clone)]
pub struct MockDescribeBackend {
    behavior: Behavior,
    latency: Duration,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Asset>>>,
}

impl Default for MockDescribeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDescribeBackend {
    pub fn new() -> Self {
        Self {
            behavior: Behavior::Respond(Enrichment {
                title: "mock title".to_string(),
                tags: vec!["mock".to_string()],
            }),
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(mut self, title: &str, tags: &[&str]) -> Self {
        self.behavior = Behavior::Respond(Enrichment {
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    /// Every call fails with an upstream error.
    pub fn failing(mut self, message: &str) -> Self {
        self.behavior = Behavior::Fail(message.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Assets passed to `describe`, in call order.
    pub fn seen_assets(&self) -> Vec<Asset> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DescribeBackend for MockDescribeBackend {
    async fn describe(&self, asset: &Asset) -> Result<Enrichment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(asset.clone());
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.behavior {
            Behavior::Respond(e) => e.clone().normalized(),
            Behavior::Fail(msg) => Err(Error::Upstream(msg.clone())),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
