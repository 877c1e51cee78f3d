//! SQLite connection pool management.

use std::path::Path;
use std::time::{Duration, Instant};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::sqlite::SqliteSynchronous;
use tracing::info;

use scaffold_core::{Error, Result};

/// Default maximum number of connections in the pool.
///
/// One connection serializes every statement, so a resolve issued after a
/// revoke returned can never observe the revoked row.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 1;

/// Default connection acquire timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default SQLite busy timeout in seconds.
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection acquire timeout.
    pub connect_timeout: Duration,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Set the acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Open (creating if missing) a SQLite database file with default configuration.
pub async fn create_pool(path: &Path) -> Result<SqlitePool> {
    create_pool_with_config(path, PoolConfig::default()).await
}

/// Open (creating if missing) a SQLite database file with custom configuration.
pub async fn create_pool_with_config(path: &Path, config: PoolConfig) -> Result<SqlitePool> {
    let start = Instant::now();

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        path = %path.display(),
        max_connections = config.max_connections,
        connect_timeout_secs = config.connect_timeout.as_secs(),
        "Creating database connection pool"
    );

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect_with(options)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_single_connection() {
        assert_eq!(PoolConfig::default().max_connections, 1);
    }

    #[test]
    fn test_pool_config_builder() {
        let config = PoolConfig::new()
            .max_connections(4)
            .busy_timeout(Duration::from_secs(1))
            .connect_timeout(Duration::from_secs(60));

        assert_eq!(config.max_connections, 4);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_create_pool_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.db");
        let pool = create_pool(&path).await.unwrap();
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
        assert!(path.exists());
    }
}
