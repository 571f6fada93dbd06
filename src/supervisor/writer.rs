//! Serialized outbound half of a connection.
//!
//! Every task that writes to a connection goes through a clone of the same
//! `ConnectionWriter`. The mutex is held for the full send, so one message
//! is always written completely before the next one starts.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tokio::sync::Mutex;

use super::TransportError;

pub struct ConnectionWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for ConnectionWriter<W> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<W> ConnectionWriter<W>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    pub fn new(sink: W) -> Self {
        Self { inner: Arc::new(Mutex::new(sink)) }
    }

    /// Send one text message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Send`] if the underlying sink rejects the
    /// message, which for a websocket means the connection is gone.
    pub async fn send_text(&self, text: String) -> Result<(), TransportError> {
        let mut sink = self.inner.lock().await;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}
