//! Receive loop: inbound messages → frame sink.
//!
//! ERROR HANDLING
//! ==============
//! Nothing a client sends can end this loop. Non-JSON text, unknown message
//! types, bad base64, and sink failures are logged and the message dropped.
//! Only the transport ends it: a close frame or end of stream is a normal
//! exit, a read error is a `TransportError`.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{TaskExit, TaskResult, TransportError};
use crate::decode;
use crate::message::{self, CameraFrame, Inbound};
use crate::services::sink::{FrameMeta, FrameSink};

/// Longest slice of an unparseable message echoed into the log.
const LOG_PREVIEW_CHARS: usize = 64;

/// What the receiver did with one text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    FrameStored,
    Malformed,
    DecodeFailed,
    SinkFailed,
    Heartbeat,
    Ignored,
}

/// Consume `inbound` until the peer closes, the transport fails, or `cancel`
/// fires.
pub async fn run<R, E>(
    conn_id: Uuid,
    mut inbound: R,
    sink: Arc<dyn FrameSink>,
    cancel: CancellationToken,
) -> TaskResult
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut frames_stored: u64 = 0;

    let result = loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break Ok(TaskExit::Cancelled),
            next = inbound.next() => next,
        };

        let msg = match next {
            None => break Ok(TaskExit::PeerClosed),
            Some(Err(e)) => break Err(TransportError::Receive(e.to_string())),
            Some(Ok(msg)) => msg,
        };

        match msg {
            Message::Text(text) => {
                if handle_text(conn_id, text.as_str(), sink.as_ref()).await == Handled::FrameStored {
                    frames_stored += 1;
                }
            }
            Message::Binary(bytes) => {
                warn!(%conn_id, len = bytes.len(), "receiver: binary message ignored");
            }
            Message::Close(_) => break Ok(TaskExit::PeerClosed),
            // The transport answers pings on its own.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    };

    debug!(%conn_id, frames_stored, ?result, "receiver: stopped");
    result
}

/// Parse one text message and act on it.
pub async fn handle_text(conn_id: Uuid, text: &str, sink: &dyn FrameSink) -> Handled {
    let inbound = match message::parse_inbound(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(%conn_id, error = %e, preview = %preview(text), "receiver: non-json message dropped");
            return Handled::Malformed;
        }
    };

    match inbound {
        Inbound::CameraFrame(frame) => store_frame(conn_id, &frame, sink).await,
        Inbound::Heartbeat => {
            debug!(%conn_id, "receiver: heartbeat");
            Handled::Heartbeat
        }
        Inbound::Other { kind } => {
            info!(%conn_id, kind = kind.as_deref().unwrap_or("-"), "receiver: message ignored");
            Handled::Ignored
        }
    }
}

async fn store_frame(conn_id: Uuid, frame: &CameraFrame, sink: &dyn FrameSink) -> Handled {
    let bytes = match decode::decode(&frame.data) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%conn_id, error = %e, "receiver: camera frame dropped");
            return Handled::DecodeFailed;
        }
    };
    if bytes.is_empty() {
        warn!(%conn_id, "receiver: camera frame has an empty body, dropped");
        return Handled::DecodeFailed;
    }

    let meta = FrameMeta { timestamp: frame.timestamp.as_deref(), mime: decode::mime_type(&frame.data) };
    match sink.store(&bytes, meta).await {
        Ok(()) => {
            debug!(%conn_id, bytes = bytes.len(), timestamp = ?frame.timestamp, "receiver: camera frame stored");
            Handled::FrameStored
        }
        Err(e) => {
            error!(%conn_id, error = %e, "receiver: camera frame not stored");
            Handled::SinkFailed
        }
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if out.len() < text.len() {
        out.push('…');
    }
    out
}

#[cfg(test)]
#[path = "receiver_test.rs"]
mod tests;
