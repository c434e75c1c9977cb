//! HTTP server setup and routing
//!
//! Axum router over a cloneable application context: catalog management,
//! one-shot file recognition, the live WebSocket recognition endpoint, and
//! stats/health.

use axum::http::HeaderValue;
use axum::{
    routing::{get, post, put},
    Router,
};
use earmark_common::params::SessionParams;
use earmark_common::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::db::CatalogStore;
use crate::ingest::IngestService;
use crate::recognize::RecognitionEngine;

/// Shared application context passed to all handlers.
///
/// Clone is cheap (everything interesting sits behind an `Arc`), which also
/// gives handlers `State` extraction for free.
#[derive(Clone)]
pub struct AppContext {
    pub catalog: Arc<CatalogStore>,
    pub engine: Arc<RecognitionEngine>,
    pub ingest: Arc<IngestService>,
    pub session_params: SessionParams,
    pub config: Config,
}

/// Build the application router.
pub fn router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.allowed_origins);

    Router::new()
        .route("/health", get(super::handlers::health))
        // live streaming recognition
        .route("/api/recognize/live", get(super::ws::recognize_live))
        // one-shot recognition of an uploaded audio file
        .route("/api/recognize/file", post(super::handlers::recognize_file))
        // catalog management
        .route(
            "/api/songs",
            get(super::handlers::list_songs).post(super::handlers::add_song),
        )
        .route(
            "/api/songs/:id",
            get(super::handlers::get_song).delete(super::handlers::delete_song),
        )
        .route("/api/songs/:id/metadata", put(super::handlers::update_metadata))
        .route("/api/stats", get(super::handlers::stats))
        .with_state(ctx)
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
}

/// Run the HTTP API server until it exits.
pub async fn run(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.host, ctx.config.port)
        .parse()
        .map_err(|e| Error::Config(format!("invalid bind address: {e}")))?;

    let app = router(ctx);

    info!("starting HTTP server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Transport(format!("server error: {e}")))?;

    Ok(())
}
