//! Capabilities injected into connection supervisors.
//!
//! ARCHITECTURE
//! ============
//! `sink` stores decoded frames and `command` stands in for the gesture
//! recognizer. Both are traits so the supervisor never depends on the
//! filesystem or on randomness directly.

pub mod command;
pub mod sink;
