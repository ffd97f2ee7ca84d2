//! Main HTTP Gateway Server.

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use richdoc_core::DocumentStore;
use richdoc_plugins::ClientApiRegistry;

use crate::{client_api, documents, health_api};

/// Default request body limit; data-URI images are a third larger than the image.
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<ClientApiRegistry>,
    pub store: Arc<dyn DocumentStore>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(registry: ClientApiRegistry, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            started_at: Instant::now(),
        }
    }
}

/// Build the gateway router.
pub fn build_router(state: GatewayState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/client-apis", get(client_api::list_client_apis))
        .route("/api/client-apis/:template_id", post(client_api::invoke_client_api))
        .route("/doc/:id", get(documents::serve_document))
        .route("/api/health", get(health_api::get_health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the Axum HTTP server and runs until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState, max_body_bytes: usize) -> Result<()> {
    let app = build_router(state, max_body_bytes);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
