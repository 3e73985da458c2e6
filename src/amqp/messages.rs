//! AMQP message definitions and serialization

use crate::error::{QueueError, Result};
use crate::types::*;
use crate::utils::{current_timestamp, generate_correlation_id};
use serde_json;

/// Default AMQP queue and exchange names
pub const COMMAND_QUEUE: &str = "scrim.commands";
pub const REPLY_EXCHANGE: &str = "scrim.replies";
pub const MATCHUP_EVENTS_EXCHANGE: &str = "scrim.matchup_events";

/// Routing keys for events
pub const REPLIES_ROUTING_KEY: &str = "queue.replies";
pub const MATCHUP_FORMED_ROUTING_KEY: &str = "matchup.formed";

/// Message envelope with metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageEnvelope<T> {
    pub payload: T,
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub routing_key: String,
}

impl<T> MessageEnvelope<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a new message envelope
    pub fn new(payload: T, routing_key: String) -> Self {
        Self {
            payload,
            correlation_id: generate_correlation_id(),
            timestamp: current_timestamp(),
            routing_key,
        }
    }

    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            QueueError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            QueueError::InvalidCommand {
                reason: format!("Failed to deserialize message: {}", e),
            }
            .into()
        })
    }
}

/// Message serialization and validation utilities
pub struct MessageUtils;

impl MessageUtils {
    /// Serialize a command request to bytes
    pub fn serialize_command_request(request: &CommandRequest) -> Result<Vec<u8>> {
        Self::validate_command_request(request)?;
        serde_json::to_vec(request).map_err(|e| {
            QueueError::InternalError {
                message: format!("Failed to serialize command request: {}", e),
            }
            .into()
        })
    }

    /// Deserialize command request from bytes
    pub fn deserialize_command_request(bytes: &[u8]) -> Result<CommandRequest> {
        let request: CommandRequest =
            serde_json::from_slice(bytes).map_err(|e| QueueError::InvalidCommand {
                reason: format!("Failed to deserialize command request: {}", e),
            })?;

        Self::validate_command_request(&request)?;
        Ok(request)
    }

    /// Validate a command request
    pub fn validate_command_request(request: &CommandRequest) -> Result<()> {
        if request.scope_id.is_empty() {
            return Err(QueueError::InvalidCommand {
                reason: "Scope ID cannot be empty".to_string(),
            }
            .into());
        }

        if let Some(user) = request.command.user() {
            if user.id.is_empty() {
                return Err(QueueError::InvalidCommand {
                    reason: "User ID cannot be empty".to_string(),
                }
                .into());
            }
            if user.label.is_empty() {
                return Err(QueueError::InvalidCommand {
                    reason: "User label cannot be empty".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Get routing key for an outbound event
    pub fn get_routing_key(event: &QueueEvent) -> &'static str {
        match event {
            QueueEvent::ReplyBatch(_) => REPLIES_ROUTING_KEY,
            QueueEvent::MatchupFormed(_) => MATCHUP_FORMED_ROUTING_KEY,
        }
    }
}
