//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use super::notifications::push_notification;
use super::websocket::{ws_handler, HubState};
use crate::client::endpoint::{NOTIFICATION_PATH, WS_PATH};

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<HubState>) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(&format!("{WS_PATH}/:token"), get(ws_handler))
        .route(&format!("{NOTIFICATION_PATH}/:user_id"), post(push_notification))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

/// Serve the hub on `listener` until the future is dropped or the server fails
pub async fn serve(listener: TcpListener, state: Arc<HubState>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "hub listening");
    }
    axum::serve(listener, create_router(state)).await
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
