//! HTTP API
//!
//! Routes are grouped per area and merged into one router. All handlers
//! answer in the `ApiResponse` envelope, except the gateway confirmation
//! webhook which answers the gateway's own result format.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

pub mod catalog;
pub mod health;
pub mod payments;
pub mod reports;
pub mod sessions;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(payments::router())
        .merge(sessions::router())
        .merge(catalog::router())
        .merge(reports::router())
        .merge(health::router())
}

/// Build a fully configured application with middleware and state
pub fn build_app(state: ServerState) -> Router {
    build_router()
        // CORS - handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Trace - request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
