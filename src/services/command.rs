//! Command source — stand-in for the gesture recognizer.
//!
//! Until a real model is wired in, commands are drawn uniformly at random
//! from the four playback actions. The emitter only sees the
//! `CommandSource` trait, so tests swap in scripted sources.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::message::Command;

pub trait CommandSource: Send {
    /// Produce the command for the current tick.
    fn next_command(&mut self) -> Command;
}

/// Builds one `CommandSource` per connection.
pub type CommandSourceFactory = Arc<dyn Fn() -> Box<dyn CommandSource> + Send + Sync>;

/// Uniform, independent draws with replacement.
pub struct RandomCommandSource {
    rng: StdRng,
}

impl RandomCommandSource {
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self { rng }
    }
}

impl CommandSource for RandomCommandSource {
    fn next_command(&mut self) -> Command {
        Command::ALL[self.rng.random_range(0..Command::ALL.len())]
    }
}

/// Factory for random sources. With a seed, every connection replays the
/// same sequence.
#[must_use]
pub fn random_factory(seed: Option<u64>) -> CommandSourceFactory {
    Arc::new(move || -> Box<dyn CommandSource> { Box::new(RandomCommandSource::new(seed)) })
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
