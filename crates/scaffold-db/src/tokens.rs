//! Bearer token store backed by SQLite.

use std::path::Path;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use scaffold_core::{Error, Result, TokenRepository};

use crate::pool::create_pool;

/// SQLite implementation of [`TokenRepository`].
#[derive(Clone)]
pub struct SqliteTokenRepository {
    pool: SqlitePool,
}

impl SqliteTokenRepository {
    /// Wrap an existing pool. Call [`migrate`](Self::migrate) before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database file at `path` and ensure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let repo = Self::new(create_pool(path).await?);
        repo.migrate().await?;
        Ok(repo)
    }

    /// Create the `tokens` table if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                token TEXT PRIMARY KEY NOT NULL,
                userid TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, flushing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    #[instrument(skip(self), fields(subsystem = "db", component = "tokens", op = "issue"))]
    async fn issue(&self, user_id: &str) -> Result<String> {
        loop {
            let token = Uuid::new_v4().to_string();
            let inserted = sqlx::query(
                "INSERT INTO tokens (token, userid) VALUES (?, ?) ON CONFLICT(token) DO NOTHING",
            )
            .bind(&token)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

            if inserted == 1 {
                info!(owner = %user_id, "Issued token");
                return Ok(token);
            }
            debug!("Token collision, retrying");
        }
    }

    async fn resolve(&self, token: &str) -> Result<Option<String>> {
        let owner: Option<String> = sqlx::query_scalar("SELECT userid FROM tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    #[instrument(skip(self, token), fields(subsystem = "db", component = "tokens", op = "revoke"))]
    async fn revoke(&self, token: &str) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::NotFound("Token not found".to_string()));
        }
        info!("Revoked token");
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
