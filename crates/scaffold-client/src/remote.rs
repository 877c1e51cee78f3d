//! HTTP client for the remote store.
//!
//! A call succeeds only when the status is 2xx **and** the body carries no
//! `error` field. Failures map onto the shared error taxonomy by status:
//! 401 is `Unauthorized`, 404 is `NotFound`, 400 is `InvalidInput`, and
//! everything else (including transport errors) is `Upstream`.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use scaffold_core::secret_keys::{CLOUD_TOKEN, CLOUD_URL};
use scaffold_core::{
    Error, IdRequest, InsertRequest, InsertResponse, QueryRequest, RemoteRecord, Result,
    SecretStore, SuccessResponse, UpdateRequest, VersionResponse, PROTOCOL_VERSION,
};

#[derive(Debug, Clone)]
pub struct RemoteClient {
    origin: String,
    token: String,
    client: reqwest::Client,
}

impl RemoteClient {
    /// Client for the store at `base_url`. Only the URL's origin is kept;
    /// any path the user pasted along with it is ignored.
    pub fn new(base_url: &str, token: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let url = Url::parse(base_url.trim())
            .map_err(|e| Error::Config(format!("invalid remote URL {:?}: {}", base_url, e)))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(Error::Config(format!(
                "remote URL {:?} has no http origin",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            origin: origin.ascii_serialization(),
            token: token.into(),
            client,
        })
    }

    /// Client built from the stored `CLOUD_URL` and `CLOUD_TOKEN`, or `None`
    /// when either is missing.
    pub async fn from_secrets(secrets: &dyn SecretStore, timeout_secs: u64) -> Result<Option<Self>> {
        let url = secrets.get(CLOUD_URL).await?.filter(|v| !v.trim().is_empty());
        let token = secrets.get(CLOUD_TOKEN).await?.filter(|v| !v.trim().is_empty());
        match (url, token) {
            (Some(url), Some(token)) => Ok(Some(Self::new(&url, token, timeout_secs)?)),
            _ => Ok(None),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The version string the server reports.
    pub async fn version(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/version", self.origin))
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("GET /version failed: {}", e)))?;
        let body: VersionResponse = decode(response).await?;
        Ok(body.version)
    }

    /// Fail with `VersionMismatch` unless the server runs exactly this
    /// client's protocol version.
    pub async fn ensure_compatible(&self) -> Result<()> {
        let actual = self.version().await?;
        if actual != PROTOCOL_VERSION {
            return Err(Error::VersionMismatch {
                expected: PROTOCOL_VERSION.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Upload a new record and return its cloud id.
    pub async fn insert(&self, request: &InsertRequest) -> Result<String> {
        let response: InsertResponse = self.post("/insert", request).await?;
        Ok(response.cloud_id)
    }

    /// Replace title and tags of an uploaded record. Returns the (unchanged) cloud id.
    pub async fn update(&self, cloud_id: &str, title: &str, tags: &[String]) -> Result<String> {
        let request = UpdateRequest {
            id: Some(cloud_id.to_string()),
            title: Some(title.to_string()),
            tags: Some(tags.to_vec()),
        };
        let response: InsertResponse = self.post("/update", &request).await?;
        Ok(response.cloud_id)
    }

    pub async fn remove(&self, cloud_id: &str) -> Result<()> {
        let request = IdRequest {
            id: Some(cloud_id.to_string()),
        };
        let _: SuccessResponse = self.post("/remove", &request).await?;
        Ok(())
    }

    pub async fn get(&self, cloud_id: &str) -> Result<RemoteRecord> {
        let request = IdRequest {
            id: Some(cloud_id.to_string()),
        };
        self.post("/get", &request).await
    }

    pub async fn query(&self, query: &str) -> Result<Vec<RemoteRecord>> {
        let request = QueryRequest {
            query: Some(query.to_string()),
        };
        self.post("/query", &request).await
    }

    #[instrument(skip(self, body), fields(subsystem = "client", component = "remote", op = %path))]
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.origin, path))
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("POST {} failed: {}", path, e)))?;
        debug!(status = %response.status(), "Remote responded");
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Upstream(format!("failed to read response body: {}", e)))?;
    let value: Option<Value> = serde_json::from_str(&text).ok();

    let error = value
        .as_ref()
        .and_then(|v| v.get("error"))
        .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()));

    if !status.is_success() || error.is_some() {
        let message = error.unwrap_or_else(|| text.trim().to_string());
        return Err(match status {
            StatusCode::UNAUTHORIZED => Error::Unauthorized(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::BAD_REQUEST => Error::InvalidInput(message),
            _ => Error::Upstream(format!("{}: {}", status, message)),
        });
    }

    let value = value.ok_or_else(|| {
        Error::Upstream(format!("response is not JSON: {}", text.trim()))
    })?;
    serde_json::from_value(value)
        .map_err(|e| Error::Upstream(format!("unexpected response shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_drops_path() {
        let client = RemoteClient::new("https://store.example.com:8443/some/path?x=1", "t", 5).unwrap();
        assert_eq!(client.origin(), "https://store.example.com:8443");
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        assert!(matches!(
            RemoteClient::new("not a url", "t", 5),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RemoteClient::new("data:text/plain,hi", "t", 5),
            Err(Error::Config(_))
        ));
    }
}
