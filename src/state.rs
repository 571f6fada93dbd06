//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! carries the capabilities every connection supervisor needs: the frame
//! sink (shared by all connections), a factory for per-connection command
//! sources, and the emit interval. Nothing in here is mutated after
//! startup; connections share no state beyond the sink.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::services::command::{self, CommandSourceFactory};
use crate::services::sink::{FileSink, FrameSink, SinkError};

/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub frame_sink: Arc<dyn FrameSink>,
    pub command_sources: CommandSourceFactory,
    /// Period between emitted commands.
    pub interval: Duration,
    pub max_message_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(
        frame_sink: Arc<dyn FrameSink>,
        command_sources: CommandSourceFactory,
        interval: Duration,
        max_message_bytes: usize,
    ) -> Self {
        Self { frame_sink, command_sources, interval, max_message_bytes }
    }

    /// Build production state: file sink plus random command sources.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the frames directory cannot be created.
    pub async fn from_config(config: &Config) -> Result<Self, SinkError> {
        let sink = FileSink::create(&config.frames_dir, config.frame_mode).await?;
        info!(frames_dir = %sink.dir().display(), mode = ?config.frame_mode, "frame sink ready");
        Ok(Self::new(
            Arc::new(sink),
            command::random_factory(config.command_seed),
            config.interval(),
            config.max_message_bytes,
        ))
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;
    use crate::message::Command;
    use crate::services::command::CommandSource;

    #[test]
    fn scripted_source_repeats_last_command() {
        let mut source = ScriptedCommandSource::new([Command::Next, Command::Previous]);
        assert_eq!(source.next_command(), Command::Next);
        assert_eq!(source.next_command(), Command::Previous);
        assert_eq!(source.next_command(), Command::Previous);
    }

    #[tokio::test]
    async fn from_config_creates_frames_dir() {
        use clap::Parser;

        let tmp = tempfile::tempdir().unwrap();
        let frames_dir = tmp.path().join("frames");
        let config = Config::try_parse_from([
            "gesture-bridge",
            "--frames-dir",
            frames_dir.to_str().unwrap(),
            "--interval-secs",
            "4",
        ])
        .unwrap();

        let state = AppState::from_config(&config).await.unwrap();
        assert!(frames_dir.is_dir());
        assert_eq!(state.interval, Duration::from_secs(4));
        let mut source = (state.command_sources)();
        assert!(Command::ALL.contains(&source.next_command()));
    }
}
