//! Device configuration from the environment.

use std::path::PathBuf;

use scaffold_core::defaults::{CLIENT_DATA_DIR, CLIENT_TIMEOUT_SECS, ENV_CLIENT_DATA_DIR};

/// Where the device keeps its data and how long remote calls may take.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Holds `images.json`, `secrets.json` and the `images/` directory.
    pub data_dir: PathBuf,
    /// Timeout for each request to the remote store, in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(CLIENT_DATA_DIR),
            timeout_secs: CLIENT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SCAFFOLD_DATA_DIR` | `.scaffold` | Device data directory |
    /// | `SCAFFOLD_TIMEOUT_SECS` | `30` | Remote request timeout |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var(ENV_CLIENT_DATA_DIR)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            timeout_secs: std::env::var("SCAFFOLD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.data_dir, PathBuf::from(".scaffold"));
        assert_eq!(config.timeout_secs, CLIENT_TIMEOUT_SECS);
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::default()
            .with_data_dir("/tmp/device")
            .with_timeout_secs(3);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/device"));
        assert_eq!(config.timeout_secs, 3);
    }
}
