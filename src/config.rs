//! Process configuration from CLI flags and environment variables.
//!
//! Every flag has an environment fallback so the server can be configured
//! from a `.env` file (loaded by `main` via `dotenvy`) as well as the
//! command line.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_FRAMES_DIR: &str = "received_frames";
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// How decoded camera frames are retained on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FrameMode {
    /// Overwrite a single well-known file with the newest frame.
    #[default]
    Latest,
    /// Keep every frame under a timestamp-keyed filename.
    Timestamped,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("command interval must be at least 1 second")]
    ZeroInterval,
    #[error("max message size must be non-zero")]
    ZeroMaxMessage,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "gesture-bridge", about = "Camera frame intake and gesture command WebSocket server")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "GESTURE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "GESTURE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds between synthetic gesture commands.
    #[arg(long, env = "GESTURE_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Directory decoded camera frames are written to.
    #[arg(long, env = "GESTURE_FRAMES_DIR", default_value = DEFAULT_FRAMES_DIR)]
    pub frames_dir: PathBuf,

    #[arg(long, value_enum, env = "GESTURE_FRAME_MODE", default_value_t = FrameMode::Latest)]
    pub frame_mode: FrameMode,

    /// Seed for the command generator; random per process when absent.
    #[arg(long, env = "GESTURE_COMMAND_SEED")]
    pub command_seed: Option<u64>,

    /// Largest inbound WebSocket message accepted, in bytes.
    #[arg(long, env = "GESTURE_MAX_MESSAGE_BYTES", default_value_t = DEFAULT_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: usize,
}

impl Config {
    /// Reject values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero interval or zero message limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_message_bytes == 0 {
            return Err(ConfigError::ZeroMaxMessage);
        }
        Ok(())
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// `host:port` as given; resolution happens at bind time.
    #[must_use]
    pub fn bind_address(&self) -> String {
        match self.host.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
