//! Frame sink — where decoded camera frames end up.
//!
//! DESIGN
//! ======
//! Receivers never touch the filesystem directly; they hand bytes to an
//! injected `FrameSink`. The file-backed sink is shared by every
//! connection, so writes are serialized behind a mutex and each one goes
//! through a temp file that is renamed over the destination. External
//! readers of `latest_frame.jpg` therefore see either the previous image or
//! the new one, never a torn write.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::config::FrameMode;

/// Filename used in [`FrameMode::Latest`].
pub const LATEST_FRAME_FILE: &str = "latest_frame.jpg";

const DEFAULT_EXTENSION: &str = "jpg";

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create frames directory {path}: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("failed to write frame to {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Metadata carried alongside frame bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMeta<'a> {
    /// Client-supplied timestamp, unsanitized.
    pub timestamp: Option<&'a str>,
    /// Mime type from the data-URL prefix.
    pub mime: Option<&'a str>,
}

#[async_trait::async_trait]
pub trait FrameSink: Send + Sync {
    /// Store one decoded frame. A completed call is fully visible to readers.
    async fn store(&self, bytes: &[u8], meta: FrameMeta<'_>) -> Result<(), SinkError>;
}

// =============================================================================
// FILE SINK
// =============================================================================

pub struct FileSink {
    dir: PathBuf,
    mode: FrameMode,
    write_lock: Mutex<()>,
}

impl FileSink {
    /// Create the frames directory if needed and return a sink writing into it.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::CreateDir`] if the directory cannot be created.
    pub async fn create(dir: impl Into<PathBuf>, mode: FrameMode) -> Result<Self, SinkError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SinkError::CreateDir { path: dir.clone(), source })?;
        Ok(Self { dir, mode, write_lock: Mutex::new(()) })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination path for a frame with the given metadata.
    #[must_use]
    pub fn target_path(&self, meta: FrameMeta<'_>) -> PathBuf {
        match self.mode {
            FrameMode::Latest => self.dir.join(LATEST_FRAME_FILE),
            FrameMode::Timestamped => {
                let stamp = meta
                    .timestamp
                    .map(sanitize_timestamp)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| now_millis().to_string());
                self.dir.join(format!("frame_{stamp}.{}", extension_for(meta.mime)))
            }
        }
    }
}

#[async_trait::async_trait]
impl FrameSink for FileSink {
    async fn store(&self, bytes: &[u8], meta: FrameMeta<'_>) -> Result<(), SinkError> {
        let target = self.target_path(meta);
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));

        let _guard = self.write_lock.lock().await;
        if let Err(source) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(SinkError::Write { path: tmp, source });
        }
        if let Err(source) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(SinkError::Write { path: target, source });
        }

        debug!(path = %target.display(), bytes = bytes.len(), "sink: frame written");
        Ok(())
    }
}

/// Keep `[A-Za-z0-9_-]`, replace everything else so the stamp is a safe
/// path component.
fn sanitize_timestamp(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn extension_for(mime: Option<&str>) -> &'static str {
    match mime {
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        Some("image/bmp") => "bmp",
        _ => DEFAULT_EXTENSION,
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod tests;
