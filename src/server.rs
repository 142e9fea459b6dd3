//!
//! tiled HTTP server
//! -----------------
//! This module assembles the Axum router that serves the catalog tree.
//!
//! Responsibilities:
//! - Shared state: config, the catalog root, the frozen search registry,
//!   the token store and the array provider.
//! - Route groups for discovery, metadata, listing, search, block and full
//!   array data, and tokens (see `routes`).
//! - Middleware: request tracing, a per-request timeout and panic capture,
//!   all rendering the same JSON error body as handler errors.
//! - Startup: loading the catalog document (or the demo tree) and binding
//!   the listener.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::error_handling::HandleErrorLayer;
use axum::extract::OriginalUri;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::catalog::demo::demo_tree;
use crate::catalog::loader::load_tree_from_path;
use crate::catalog::Entry;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::identity::TokenStore;
use crate::provider::{ArrayProvider, WorkerPoolProvider};
use crate::query::{QueryRegistry, QueryRegistryBuilder};

pub mod auth;
pub mod envelope;
pub mod extract;
pub mod params;
pub mod routes;

/// Shared server state injected into all handlers. Everything here is
/// immutable after startup except the token store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub root: Arc<Entry>,
    pub registry: Arc<QueryRegistry>,
    pub tokens: TokenStore,
    pub provider: Arc<dyn ArrayProvider>,
}

impl AppState {
    pub fn new(config: ServerConfig, root: Arc<Entry>, registry: QueryRegistry) -> Self {
        let provider = WorkerPoolProvider::new(
            config.max_concurrent_computations,
            Duration::from_secs(config.compute_timeout_secs),
        );
        Self::with_provider(config, root, registry, Arc::new(provider))
    }

    /// Same as [`AppState::new`] with a caller-supplied provider.
    pub fn with_provider(
        config: ServerConfig,
        root: Arc<Entry>,
        registry: QueryRegistry,
        provider: Arc<dyn ArrayProvider>,
    ) -> Self {
        let tokens = TokenStore::new(config.admin_users.iter().cloned());
        for (user, token) in &config.bootstrap_tokens {
            tokens.insert(user, token);
        }
        Self { config: Arc::new(config), root, registry: Arc::new(registry), tokens, provider }
    }
}

pub fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .merge(routes::catalog::routes())
        .merge(routes::arrays::routes())
        .merge(routes::tokens::routes())
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

async fn not_found(uri: OriginalUri) -> AppError { AppError::not_found(uri.0.path().trim_start_matches('/')) }

async fn handle_timeout_error(err: tower::BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout { message: "Request timed out".to_string() }
    } else {
        AppError::internal(err.to_string())
    }
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(target: "server", "handler panicked: {}", detail);
    AppError::internal("Internal server error").into_response()
}

fn log_startup(cfg: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "startup",
        "tiled starting at {}: cwd={:?}, RUST_LOG='{}', catalog={:?}",
        chrono::Local::now().to_rfc3339(), cwd, rust_log, cfg.catalog_path
    );
    info!(
        target: "startup",
        "Access: anonymous_reads={}, admins={:?}, bootstrap_tokens_for={:?}",
        cfg.allow_anonymous_access,
        cfg.admin_users,
        cfg.bootstrap_tokens.keys().collect::<Vec<_>>()
    );
    info!(
        target: "startup",
        "Limits: page default={} max={}, request_timeout={}s, compute_timeout={}s, workers={}, max_response_bytes={}",
        cfg.default_page_limit,
        cfg.max_page_limit,
        cfg.request_timeout_secs,
        cfg.compute_timeout_secs,
        cfg.max_concurrent_computations,
        cfg.max_response_bytes
    );
}

/// Load the tree the config points at, or the demo tree when it points
/// nowhere.
pub fn load_root(cfg: &ServerConfig) -> anyhow::Result<Arc<Entry>> {
    match &cfg.catalog_path {
        Some(path) => {
            load_tree_from_path(path).with_context(|| format!("While loading catalog document {}", path.display()))
        }
        None => {
            info!(target: "startup", "No catalog document configured; serving the demo tree");
            Ok(demo_tree())
        }
    }
}

/// Start the server with the built-in search descriptors.
pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    let registry = QueryRegistryBuilder::new().with_builtins()?;
    run_with_registry(cfg, registry).await
}

/// Start the server with a caller-assembled registry. Descriptors can only
/// be added before this point; the registry is frozen once serving begins.
pub async fn run_with_registry(cfg: ServerConfig, registry: QueryRegistryBuilder) -> anyhow::Result<()> {
    cfg.validate()?;
    log_startup(&cfg);

    let root = load_root(&cfg)?;
    let registry = registry.build();
    info!(
        target: "startup",
        "Search descriptors: {:?}",
        registry.iter().map(|d| d.name()).collect::<Vec<_>>()
    );

    let addr = cfg.socket_addr()?;
    let app = build_router(AppState::new(cfg, root, registry));

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("While binding {}", addr))?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let cfg = ServerConfig { allow_anonymous_access: true, ..ServerConfig::default() };
        build_router(AppState::new(cfg, demo_tree(), QueryRegistry::builtins()))
    }

    #[test]
    fn bootstrap_tokens_are_live() {
        let mut cfg = ServerConfig::default();
        cfg.bootstrap_tokens.insert("alice".into(), "secret-a".into());
        let state = AppState::new(cfg, demo_tree(), QueryRegistry::builtins());
        assert_eq!(state.tokens.validate("secret-a").map(|p| p.user_id), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let resp = app()
            .oneshot(Request::builder().uri("/no/such/route").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["code"], "not_found");
    }

    #[test]
    fn missing_catalog_document_is_an_error() {
        let cfg = ServerConfig { catalog_path: Some("/definitely/not/here.json".into()), ..ServerConfig::default() };
        assert!(load_root(&cfg).is_err());
    }

    #[tokio::test]
    async fn elapsed_maps_to_gateway_timeout() {
        let err = handle_timeout_error(Box::new(tower::timeout::error::Elapsed::new())).await;
        assert_eq!(err.http_status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.code_str(), "timeout");
        let other = handle_timeout_error("boom".into()).await;
        assert_eq!(other.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
