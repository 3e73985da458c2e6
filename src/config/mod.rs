//! Configuration management for the scrim-queue service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values for the queue service.

pub mod app;
pub mod matchup;

// Re-export commonly used types
pub use app::{validate_config, AmqpSettings, AppConfig, MatchmakingSettings, ServiceSettings};
pub use matchup::MatchConfig;
