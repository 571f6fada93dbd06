//! WebSocket handler — one supervisor per connection.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → assign a connection id
//! 2. Split the socket and hand both halves to the supervisor
//! 3. Supervisor returns once both loops have stopped → socket dropped

use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::supervisor::{self, SupervisorContext};

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(state.max_message_bytes)
        .on_failed_upgrade(|e| warn!(error = %e, "ws: upgrade failed"))
        .on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(%conn_id, "ws: client connected");

    let (outbound, inbound) = socket.split();
    let ctx = SupervisorContext {
        frame_sink: state.frame_sink.clone(),
        command_source: (state.command_sources)(),
        interval: state.interval,
    };
    let report = supervisor::supervise(conn_id, inbound, outbound, ctx).await;

    info!(
        %conn_id,
        first = ?report.first,
        receive = ?report.receive,
        emit = ?report.emit,
        state = ?report.state,
        "ws: client disconnected"
    );
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
