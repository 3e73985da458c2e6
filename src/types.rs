//! Common types used throughout the queue service

use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a chat platform user
pub type UserId = String;

/// Identifier of a community (guild) whose queue state is isolated from others
pub type ScopeId = String;

/// Unique identifier for formed matchups
pub type MatchupId = Uuid;

/// The two pieces of a platform user the queue needs: a stable ID for
/// membership checks and a label for rendering replies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub label: String,
}

impl UserIdentity {
    pub fn new(id: impl Into<UserId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Queue operation requested by a chat user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum QueueCommand {
    Join { user: UserIdentity },
    Leave { user: UserIdentity },
    Status,
    Clear,
}

impl QueueCommand {
    /// Short name used for logging, metrics labels and reply batches
    pub fn name(&self) -> &'static str {
        match self {
            QueueCommand::Join { .. } => "join",
            QueueCommand::Leave { .. } => "leave",
            QueueCommand::Status => "status",
            QueueCommand::Clear => "clear",
        }
    }

    /// The user who issued the command, when the command carries one
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            QueueCommand::Join { user } | QueueCommand::Leave { user } => Some(user),
            QueueCommand::Status | QueueCommand::Clear => None,
        }
    }
}

impl std::fmt::Display for QueueCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// AMQP Message Types
/// Command forwarded by the chat gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub scope_id: ScopeId,
    #[serde(flatten)]
    pub command: QueueCommand,
    /// Opaque channel reference echoed back so the gateway knows where to reply
    #[serde(default)]
    pub reply_channel: Option<String>,
    #[serde(default = "current_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl CommandRequest {
    pub fn new(scope_id: impl Into<ScopeId>, command: QueueCommand) -> Self {
        Self {
            scope_id: scope_id.into(),
            command,
            reply_channel: None,
            timestamp: current_timestamp(),
        }
    }

    pub fn with_reply_channel(mut self, channel: impl Into<String>) -> Self {
        self.reply_channel = Some(channel.into());
        self
    }
}

/// Ordered text messages to deliver to a scope's reply channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyBatch {
    pub scope_id: ScopeId,
    pub reply_channel: Option<String>,
    pub command: String,
    pub messages: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when two teams have been formed in a scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchupFormed {
    pub matchup_id: MatchupId,
    pub scope_id: ScopeId,
    pub team1: Vec<UserIdentity>,
    pub team2: Vec<UserIdentity>,
    /// Users promoted to the high-priority list for the next round
    pub carried_over: Vec<UserIdentity>,
    pub timestamp: DateTime<Utc>,
}

/// Union type for all outbound AMQP messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    ReplyBatch(ReplyBatch),
    MatchupFormed(MatchupFormed),
}
