//! AMQP integration for the queue service
//!
//! This module handles the broker connection, inbound command consumption,
//! and publishing of replies and matchup events.

pub mod connection;
pub mod handlers;
pub mod messages;
pub mod publisher;

// Re-export commonly used types
pub use connection::{AmqpConfig, AmqpConnection};
pub use handlers::{CommandConsumer, CommandHandler};
pub use messages::*;
pub use publisher::{AmqpReplyPublisher, MockReplyPublisher, PublisherConfig, ReplyPublisher};
