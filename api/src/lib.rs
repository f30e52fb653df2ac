//! HTTP layer.
//!
//! | Route | |
//! |---|---|
//! | `GET /` | banner |
//! | `GET /healthz` | `{status: "ok"}`, always |
//! | `POST /upload/` | multipart `file` → ingest (sync) or enqueue (background) |
//! | `GET /query/` | `q`, `doc_id`, `source`, `top_k` → answer + sources |
//!
//! `/upload/` and `/query/` sit behind the optional bearer check.

pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub use crate::core::app_state::{ApiConfig, AppState, IngestMode};
pub use crate::error_handler::{AppError, AppResult};

use crate::middleware_layer::bearer_auth::require_bearer;
use crate::routes::{
    health_route::healthz, query::query_route::query, root_route::root,
    upload::upload_route::upload,
};

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/upload", post(upload))
        .route("/upload/", post(upload))
        .route("/query", get(query))
        .route("/query/", get(query))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .merge(protected)
        .layer(DefaultBodyLimit::max(state.cfg.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `cfg.address` and serve until Ctrl+C.
pub async fn start(state: Arc<AppState>) -> Result<(), AppError> {
    let addr = state.cfg.address.clone();
    if state.cfg.auth_token.is_none() {
        warn!("AUTH_TOKEN not set; /upload/ and /query/ are open");
    }
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AppError::Bind)?;
    info!(%addr, "HTTP API listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("HTTP API stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
}
