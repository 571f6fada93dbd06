//! Camera frame payload decoding.
//!
//! DESIGN
//! ======
//! Browsers send frames as data URLs (`data:image/jpeg;base64,<body>`), but
//! bare base64 bodies are accepted too. Everything up to and including the
//! first `base64,` marker is discarded without inspection, so a missing or
//! mangled scheme never blocks an otherwise valid body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Marker separating the data-URL header from the base64 body.
const BASE64_MARKER: &str = "base64,";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 frame data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Return the base64 body of a frame payload.
#[must_use]
pub fn base64_body(payload: &str) -> &str {
    payload
        .split_once(BASE64_MARKER)
        .map_or(payload, |(_, body)| body)
}

/// Decode a frame payload into raw image bytes.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidBase64`] if the body is not valid standard
/// base64 (wrong alphabet, length, or padding).
pub fn decode(payload: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(base64_body(payload))?)
}

/// Extract the mime type from a `data:<mime>;base64,` prefix, if present.
#[must_use]
pub fn mime_type(payload: &str) -> Option<&str> {
    let (header, _) = payload.split_once(BASE64_MARKER)?;
    let mime = header.strip_prefix("data:")?.strip_suffix(';')?;
    (!mime.is_empty()).then_some(mime)
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod tests;
