//! # scaffold-api
//!
//! Token-authenticated remote record store. Each tenant sees only the
//! records it inserted; search runs BM25 over titles and tags.
//!
//! The router is exposed so tests (and embedders) can serve it on any
//! listener:
//!
//! ```rust,ignore
//! let state = AppState::open(ServerConfig::from_env()?).await?;
//! let listener = tokio::net::TcpListener::bind(state.config.socket_addr()?).await?;
//! axum::serve(listener, scaffold_api::router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod index;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use scaffold_core::defaults::INDEX_SNAPSHOT_FILE;
use scaffold_core::{Result, TokenRepository};
use scaffold_db::Database;

pub use config::ServerConfig;
pub use error::ApiError;
pub use index::RemoteIndex;

/// Request ID generator using UUIDv7 (time-ordered).
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<RemoteIndex>,
    pub tokens: Arc<dyn TokenRepository>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Open the data directory: token database plus index snapshot.
    pub async fn open(config: ServerConfig) -> Result<Self> {
        let db = Database::open(&config.data_dir).await?;
        let index = RemoteIndex::open(db.snapshot(INDEX_SNAPSHOT_FILE)).await?;

        let token_count = db.tokens.count().await?;
        info!(
            subsystem = "api",
            data_dir = %config.data_dir.display(),
            token_count,
            record_count = index.len().await,
            master_token_configured = config.master_token.is_some(),
            "Remote store opened"
        );

        Ok(Self {
            index: Arc::new(index),
            tokens: Arc::new(db.tokens),
            config: Arc::new(config),
        })
    }
}

/// Build the HTTP router with request tracing and body limits.
pub fn router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/", get(handlers::meta::greeting))
        .route("/version", get(handlers::meta::version))
        .route("/health", get(handlers::meta::health))
        .route("/query", post(handlers::records::query))
        .route("/insert", post(handlers::records::insert))
        .route("/update", post(handlers::records::update))
        .route("/get", post(handlers::records::get))
        .route("/remove", post(handlers::records::remove))
        .route("/token/new", post(handlers::tokens::token_new))
        .route("/token/remove", post(handlers::tokens::token_remove))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}
