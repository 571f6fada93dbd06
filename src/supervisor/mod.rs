//! Connection supervisor — two sibling tasks, first exit cancels the other.
//!
//! LIFECYCLE
//! =========
//! 1. RUNNING: the receive loop and the emit loop are spawned over the two
//!    halves of one connection.
//! 2. DRAINING: whichever finishes first (clean close, transport error, or
//!    panic) trips the shared cancellation token.
//! 3. DONE: the survivor notices the token at its next await point and
//!    returns; both halves of the connection are dropped.
//!
//! Nothing is retried. A task ending is the shutdown trigger, not a
//! failure of the supervisor.

pub mod emitter;
pub mod receiver;
pub mod writer;

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, Stream};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::command::CommandSource;
use crate::services::sink::FrameSink;
use writer::ConnectionWriter;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Receive,
    Emit,
}

/// Normal ways for a connection task to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    /// The peer closed the connection or it is no longer writable.
    PeerClosed,
    /// The sibling task finished first.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("task aborted: {0}")]
    Aborted(String),
}

pub type TaskResult = Result<TaskExit, TransportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Draining,
    Done,
}

/// Capabilities handed to one connection.
pub struct SupervisorContext {
    pub frame_sink: Arc<dyn FrameSink>,
    pub command_source: Box<dyn CommandSource>,
    pub interval: Duration,
}

/// How a supervised connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorReport {
    pub first: TaskKind,
    pub receive: TaskResult,
    pub emit: TaskResult,
    pub state: SupervisorState,
}

// =============================================================================
// SUPERVISE
// =============================================================================

/// Run the receive and emit loops over one connection until both have
/// stopped.
pub async fn supervise<R, W, E>(
    conn_id: Uuid,
    inbound: R,
    outbound: W,
    ctx: SupervisorContext,
) -> SupervisorReport
where
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
{
    let cancel = CancellationToken::new();
    let writer = ConnectionWriter::new(outbound);

    let mut receive = tokio::spawn(receiver::run(conn_id, inbound, ctx.frame_sink, cancel.clone()));
    let mut emit = tokio::spawn(emitter::run(conn_id, writer, ctx.command_source, ctx.interval, cancel.clone()));
    let mut state = SupervisorState::Running;
    debug!(%conn_id, ?state, interval_ms = ctx.interval.as_millis(), "supervisor: tasks started");

    let (first, first_result) = tokio::select! {
        joined = &mut receive => (TaskKind::Receive, flatten(joined)),
        joined = &mut emit => (TaskKind::Emit, flatten(joined)),
    };

    state = SupervisorState::Draining;
    log_first_exit(conn_id, first, &first_result);
    debug!(%conn_id, ?state, "supervisor: cancelling sibling");
    cancel.cancel();

    let (receive, emit) = match first {
        TaskKind::Receive => (first_result, flatten(emit.await)),
        TaskKind::Emit => (flatten(receive.await), first_result),
    };

    state = SupervisorState::Done;
    debug!(%conn_id, ?state, ?receive, ?emit, "supervisor: connection released");
    SupervisorReport { first, receive, emit, state }
}

/// A panicked task ends the connection like any other terminal result.
fn flatten(joined: Result<TaskResult, JoinError>) -> TaskResult {
    joined.unwrap_or_else(|e| Err(TransportError::Aborted(e.to_string())))
}

fn log_first_exit(conn_id: Uuid, first: TaskKind, result: &TaskResult) {
    match result {
        Ok(TaskExit::PeerClosed) => info!(%conn_id, task = ?first, "supervisor: peer closed connection"),
        Ok(TaskExit::Cancelled) => debug!(%conn_id, task = ?first, "supervisor: task cancelled"),
        Err(e) => warn!(%conn_id, task = ?first, error = %e, "supervisor: connection failed"),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
