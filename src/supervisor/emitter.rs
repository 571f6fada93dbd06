//! Emit loop: one command per period.
//!
//! The schedule is anchored at task start: sends happen at `period`,
//! `2 * period`, ... regardless of how long each send takes. A tick that
//! is late (slow write, busy runtime) is delayed rather than followed by a
//! burst of catch-up sends.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::Sink;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::writer::ConnectionWriter;
use super::{TaskExit, TaskResult};
use crate::services::command::CommandSource;

/// Send one command from `source` every `period` until the connection
/// closes or `cancel` fires.
///
/// A failed write ends the task as [`TaskExit::PeerClosed`]; a gone peer is
/// the normal way for this loop to finish. Cancellation is observed both
/// while waiting for the next tick and while a write is in flight.
#[allow(clippy::unnecessary_wraps)]
pub async fn run<W>(
    conn_id: Uuid,
    writer: ConnectionWriter<W>,
    mut source: Box<dyn CommandSource>,
    period: Duration,
    cancel: CancellationToken,
) -> TaskResult
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent: u64 = 0;

    let exit = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break TaskExit::Cancelled,
            _ = ticker.tick() => {}
        }

        let command = source.next_command();
        let text = match command.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(%conn_id, %command, error = %e, "emitter: command not encodable");
                continue;
            }
        };

        // A peer that stops reading can park the write indefinitely.
        tokio::select! {
            biased;
            () = cancel.cancelled() => break TaskExit::Cancelled,
            result = writer.send_text(text) => {
                if let Err(e) = result {
                    debug!(%conn_id, error = %e, "emitter: write failed");
                    break TaskExit::PeerClosed;
                }
            }
        }
        sent += 1;
        info!(%conn_id, %command, "emitter: command sent");
    };

    debug!(%conn_id, sent, ?exit, "emitter: stopped");
    Ok(exit)
}

#[cfg(test)]
#[path = "emitter_test.rs"]
mod tests;
