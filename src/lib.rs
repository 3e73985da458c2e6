//! Scrim Queue - matchmaking queue service for chat communities
//!
//! This crate provides AMQP-based queueing with one queue and one
//! high-priority list per community, and random two-team matchup formation.

pub mod amqp;
pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use amqp::publisher::ReplyPublisher;
pub use queue::{MatchupEngine, QueueManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
