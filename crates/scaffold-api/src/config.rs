//! Server configuration from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use scaffold_core::defaults::{
    ENV_DATA_DIR, ENV_MASTER_TOKEN, MAX_BODY_BYTES, SERVER_DATA_DIR, SERVER_HOST, SERVER_PORT,
};
use scaffold_core::{Error, Result};

/// Remote store configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the index snapshot and the token database.
    pub data_dir: PathBuf,
    /// Secret gating the token administration routes. `None` disables them.
    pub master_token: Option<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: SERVER_HOST.to_string(),
            port: SERVER_PORT,
            data_dir: PathBuf::from(SERVER_DATA_DIR),
            master_token: None,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `HOST` | `0.0.0.0` | Bind address |
    /// | `PORT` | `4221` | Bind port |
    /// | `DATA_DIR` | `data` | Snapshot and token database directory |
    /// | `MASTER_TOKEN` | unset | Secret for `/token/*` routes |
    /// | `MAX_BODY_BYTES` | `1048576` | Request body limit |
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(v) => v
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("PORT={}: {}", v, e)))?,
            Err(_) => defaults.port,
        };

        let max_body_bytes = std::env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.max_body_bytes);

        Ok(Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port,
            data_dir: std::env::var(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            master_token: std::env::var(ENV_MASTER_TOKEN)
                .ok()
                .filter(|v| !v.is_empty()),
            max_body_bytes,
        })
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_master_token(mut self, token: impl Into<String>) -> Self {
        self.master_token = Some(token.into());
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address {}:{}: {}", self.host, self.port, e)))
    }
}
