//! Error types for the queue service
//!
//! Infrastructure failures propagate as `anyhow` errors; the categories below
//! cover the cases callers may want to match on. User mistakes such as joining
//! twice are not errors and never appear here.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific queue service scenarios
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("AMQP connection failed: {message}")]
    AmqpConnectionFailed { message: String },

    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },

    #[error("User {user_id} appears more than once in scope state")]
    DuplicateMember { user_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
