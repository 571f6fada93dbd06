//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The player client opens a websocket at the server root, so `/` is the
//! upgrade endpoint; `/ws` is an alias for proxies that route by path.
//! `/healthz` answers plain HTTP for liveness probes.

pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws::handle_ws))
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
