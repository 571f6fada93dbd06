//! Wire messages exchanged with the player client.
//!
//! ARCHITECTURE
//! ============
//! Inbound traffic is JSON text. Only two shapes carry meaning: camera
//! frames (`type: "camera_frame"`) and client heartbeats (`type: "ping"`).
//! Everything else is classified as `Other` so the receiver can log it and
//! move on. Outbound traffic is a single shape: `{"action": "<command>"}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Message discriminator key.
pub const MSG_TYPE: &str = "type";

/// Camera frame payload key.
pub const MSG_DATA: &str = "data";

/// Optional client timestamp key.
pub const MSG_TIMESTAMP: &str = "timestamp";

pub const TYPE_CAMERA_FRAME: &str = "camera_frame";
pub const TYPE_PING: &str = "ping";

// =============================================================================
// INBOUND
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MessageFormatError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("expected a json object, got {0}")]
    NotAnObject(&'static str),
}

/// One camera frame as sent by the client. `data` is still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    pub data: String,
    pub timestamp: Option<String>,
}

/// Classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    CameraFrame(CameraFrame),
    Heartbeat,
    /// Valid JSON object with no actionable shape. `kind` is the `type`
    /// field when it is a string.
    Other { kind: Option<String> },
}

/// Parse and classify one inbound text payload.
///
/// # Errors
///
/// Returns [`MessageFormatError`] if the text is not JSON or is JSON but not
/// an object.
pub fn parse_inbound(text: &str) -> Result<Inbound, MessageFormatError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(map) = value else {
        return Err(MessageFormatError::NotAnObject(json_kind(&value)));
    };
    Ok(classify(map))
}

fn classify(mut map: Map<String, Value>) -> Inbound {
    let kind = map.get(MSG_TYPE).and_then(Value::as_str).map(str::to_owned);

    match kind.as_deref() {
        Some(TYPE_CAMERA_FRAME) => match map.remove(MSG_DATA) {
            Some(Value::String(data)) => {
                let timestamp = map.get(MSG_TIMESTAMP).and_then(timestamp_string);
                Inbound::CameraFrame(CameraFrame { data, timestamp })
            }
            _ => Inbound::Other { kind: Some(TYPE_CAMERA_FRAME.to_owned()) },
        },
        Some(TYPE_PING) => Inbound::Heartbeat,
        _ => Inbound::Other { kind: kind.clone() },
    }
}

/// Clients send either ISO strings or `Date.now()` millis.
fn timestamp_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Playback control action sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    PlayPause,
    Next,
    Previous,
    ToggleList,
}

impl Command {
    /// Every action, in wire order.
    pub const ALL: [Command; 4] = [Command::PlayPause, Command::Next, Command::Previous, Command::ToggleList];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Command::PlayPause => "play_pause",
            Command::Next => "next",
            Command::Previous => "previous",
            Command::ToggleList => "toggle_list",
        }
    }

    /// Encode as the outbound `{"action": ...}` message.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; a unit-variant enum never produces one.
    pub fn to_json(self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&CommandMessage { action: self })
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound command message, used when reading commands back off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub action: Command,
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
