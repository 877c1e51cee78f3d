//! Ollama-compatible describe backend.
//!
//! Images go to `/api/generate` as base64 payloads alongside the image
//! prompt; pages send only the page prompt. Output is requested in JSON mode
//! and parsed with [`parse_enrichment`](crate::parse::parse_enrichment).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use scaffold_core::defaults::{
    DESCRIBE_MODEL, ENRICH_TIMEOUT_SECS, ENV_DESCRIBE_MODEL, ENV_OLLAMA_URL, OLLAMA_URL,
};
use scaffold_core::{Asset, DescribeBackend, Enrichment, Error, Result};

use crate::parse::parse_enrichment;
use crate::prompts::prompt_for;

/// Ollama-based describe backend (e.g., llava, qwen2.5vl).
pub struct OllamaDescribeBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
    api_key: Option<String>,
}

impl OllamaDescribeBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
            timeout_secs: ENRICH_TIMEOUT_SECS,
            api_key: None,
        }
    }

    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var(ENV_OLLAMA_URL)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| OLLAMA_URL.to_string());
        let model = std::env::var(ENV_DESCRIBE_MODEL)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DESCRIBE_MODEL.to_string());
        Self::new(base_url, model)
    }

    /// Bearer credential sent with every request (for hosted gateways).
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check whether the endpoint answers.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    format: &'static str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl DescribeBackend for OllamaDescribeBackend {
    #[instrument(skip(self, asset), fields(subsystem = "inference", component = "ollama", op = "describe", model = %self.model))]
    async fn describe(&self, asset: &Asset) -> Result<Enrichment> {
        let start = Instant::now();
        let images = match asset {
            Asset::Image { data, .. } => {
                vec![base64::engine::general_purpose::STANDARD.encode(data)]
            }
            Asset::Page { .. } => Vec::new(),
        };

        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt_for(asset),
            images,
            format: "json",
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Describe request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Describe endpoint returned an error");
            return Err(Error::Upstream(format!(
                "Describe API returned {}: {}",
                status, body
            )));
        }

        let result: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to parse describe response: {}", e)))?;

        let enrichment = parse_enrichment(&result.response)?;
        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            tag_count = enrichment.tags.len(),
            "Describe completed"
        );
        Ok(enrichment)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let backend = OllamaDescribeBackend::new("http://localhost:11434/", "llava");
        assert_eq!(backend.base_url(), "http://localhost:11434");
        assert_eq!(backend.model_name(), "llava");
        assert_eq!(backend.timeout_secs, ENRICH_TIMEOUT_SECS);
    }

    #[test]
    fn test_request_serialization_omits_empty_images() {
        let request = OllamaGenerateRequest {
            model: "llava".to_string(),
            prompt: "p".to_string(),
            images: vec![],
            format: "json",
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("images").is_none());
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
    }
}
