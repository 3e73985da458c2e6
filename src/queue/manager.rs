//! Queue manager: command dispatch for the queue service
//!
//! This module ties the store, the matchup engine, reply rendering, metrics
//! and the reply publisher together. Each `handle_*` operation returns the
//! ordered messages for the scope's reply channel; `handle_command` runs one
//! inbound request end to end and publishes the result.

use crate::amqp::publisher::ReplyPublisher;
use crate::config::MatchConfig;
use crate::error::{QueueError, Result};
use crate::metrics::MetricsCollector;
use crate::queue::matchup::{Matchup, MatchupEngine};
use crate::queue::replies;
use crate::queue::scope::LeaveOutcome;
use crate::queue::store::{JoinOutcome, QueueStore};
use crate::types::{
    CommandRequest, MatchupFormed, QueueCommand, ReplyBatch, ScopeId, UserIdentity,
};
use crate::utils::{current_timestamp, generate_matchup_id};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Messages produced by one command, plus the matchup it formed if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub messages: Vec<String>,
    pub matchup: Option<Matchup>,
}

impl CommandOutcome {
    fn messages(messages: Vec<String>) -> Self {
        Self {
            messages,
            matchup: None,
        }
    }
}

/// Statistics about queue manager operations
#[derive(Debug, Clone, Default)]
pub struct QueueManagerStats {
    /// Total commands handled
    pub commands_processed: u64,
    /// Successful joins
    pub joins: u64,
    /// Joins declined because the user was already waiting
    pub duplicate_joins: u64,
    /// Successful leaves
    pub leaves: u64,
    /// Total matchups formed
    pub matchups_formed: u64,
    /// Total users placed on a team
    pub players_matched: u64,
    /// Total users promoted to a high-priority list
    pub players_carried_over: u64,
    /// Current number of known scopes
    pub active_scopes: usize,
    /// Current number of users in normal queues
    pub players_queued: usize,
    /// Current number of users in high-priority lists
    pub players_high_priority: usize,
}

/// The main queue manager
#[derive(Clone)]
pub struct QueueManager {
    store: Arc<QueueStore>,
    engine: Arc<MatchupEngine>,
    reply_publisher: Arc<dyn ReplyPublisher>,
    stats: Arc<RwLock<QueueManagerStats>>,
    metrics_collector: Arc<MetricsCollector>,
}

impl QueueManager {
    /// Create a queue manager with an entropy-seeded engine
    pub fn new(config: MatchConfig, reply_publisher: Arc<dyn ReplyPublisher>) -> Self {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_engine(
            MatchupEngine::new(config),
            reply_publisher,
            metrics_collector,
        )
    }

    /// Create a queue manager with a specific engine and metrics collector
    pub fn with_engine(
        engine: MatchupEngine,
        reply_publisher: Arc<dyn ReplyPublisher>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store: Arc::new(QueueStore::new()),
            engine: Arc::new(engine),
            reply_publisher,
            stats: Arc::new(RwLock::new(QueueManagerStats::default())),
            metrics_collector,
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn match_config(&self) -> &MatchConfig {
        self.engine.config()
    }

    /// Queue a user; forms a matchup when the scope reaches the match size
    pub fn handle_join(&self, scope_id: &str, user: UserIdentity) -> Result<CommandOutcome> {
        let outcome = self.store.join(scope_id, user.clone(), &self.engine)?;

        match outcome {
            JoinOutcome::AlreadyQueued => {
                debug!("User '{}' already waiting in scope '{}'", user.id, scope_id);
                self.update_stats(|stats| stats.duplicate_joins += 1)?;
                Ok(CommandOutcome::messages(vec![replies::already_queued(&user)]))
            }
            JoinOutcome::Joined { queue_len, matchup } => {
                info!(
                    "User '{}' joined scope '{}' - queue size: {}",
                    user.id, scope_id, queue_len
                );

                let mut messages = vec![replies::joined(&user, queue_len)];
                self.update_stats(|stats| stats.joins += 1)?;

                if let Some(matchup) = &matchup {
                    info!(
                        "Matchup formed in scope '{}' - selected: {}, carried over: {}",
                        scope_id,
                        matchup.selected().count(),
                        matchup.leftover.len()
                    );
                    messages.extend(replies::matchup(matchup));
                    self.update_stats(|stats| {
                        stats.matchups_formed += 1;
                        stats.players_matched += matchup.selected().count() as u64;
                        stats.players_carried_over += matchup.leftover.len() as u64;
                    })?;
                    self.metrics_collector.record_matchup(matchup);
                }

                Ok(CommandOutcome { messages, matchup })
            }
        }
    }

    /// Remove a user from whichever list holds them
    pub fn handle_leave(&self, scope_id: &str, user: &UserIdentity) -> Result<CommandOutcome> {
        let message = match self.store.leave(scope_id, &user.id)? {
            LeaveOutcome::LeftQueue { queue_len } => {
                info!("User '{}' left the queue in scope '{}'", user.id, scope_id);
                self.update_stats(|stats| stats.leaves += 1)?;
                replies::left_queue(user, queue_len)
            }
            LeaveOutcome::LeftPriority { queue_len } => {
                info!(
                    "User '{}' left the high-priority list in scope '{}'",
                    user.id, scope_id
                );
                self.update_stats(|stats| stats.leaves += 1)?;
                replies::left_priority(user, queue_len)
            }
            LeaveOutcome::NotQueued => {
                debug!("User '{}' not waiting in scope '{}'", user.id, scope_id);
                replies::not_queued(user)
            }
        };

        Ok(CommandOutcome::messages(vec![message]))
    }

    pub fn handle_status(&self, scope_id: &str) -> Result<CommandOutcome> {
        let snapshot = self.store.status(scope_id)?;
        Ok(CommandOutcome::messages(replies::status(snapshot.as_ref())))
    }

    pub fn handle_clear(&self, scope_id: &str) -> Result<CommandOutcome> {
        self.store.clear(scope_id)?;
        info!("Cleared queue and high-priority list in scope '{}'", scope_id);
        Ok(CommandOutcome::messages(vec![replies::cleared()]))
    }

    /// Apply one command to its scope without publishing anything
    pub fn execute(&self, scope_id: &str, command: &QueueCommand) -> Result<CommandOutcome> {
        let start_time = Instant::now();

        let result = match command {
            QueueCommand::Join { user } => self.handle_join(scope_id, user.clone()),
            QueueCommand::Leave { user } => self.handle_leave(scope_id, user),
            QueueCommand::Status => self.handle_status(scope_id),
            QueueCommand::Clear => self.handle_clear(scope_id),
        };

        let duration = start_time.elapsed();
        self.metrics_collector
            .record_command(command.name(), result.is_ok(), duration);
        self.update_stats(|stats| stats.commands_processed += 1)?;

        debug!(
            "Command '{}' in scope '{}' took {:.2}ms",
            command,
            scope_id,
            duration.as_secs_f64() * 1000.0
        );

        result
    }

    /// Handle an inbound request end to end: apply it, then publish the
    /// replies and, when one formed, the matchup event.
    pub async fn handle_command(&self, request: CommandRequest) -> Result<ReplyBatch> {
        info!(
            "Processing command - scope: '{}', command: {}, user: {}",
            request.scope_id,
            request.command,
            request
                .command
                .user()
                .map(|u| u.id.as_str())
                .unwrap_or("-")
        );

        if request.scope_id.is_empty() {
            return Err(QueueError::InvalidCommand {
                reason: "Scope ID cannot be empty".to_string(),
            }
            .into());
        }

        let outcome = self.execute(&request.scope_id, &request.command)?;

        let batch = ReplyBatch {
            scope_id: request.scope_id.clone(),
            reply_channel: request.reply_channel.clone(),
            command: request.command.name().to_string(),
            messages: outcome.messages,
            timestamp: current_timestamp(),
        };

        self.reply_publisher.publish_replies(batch.clone()).await?;

        if let Some(matchup) = outcome.matchup {
            let event = Self::matchup_event(request.scope_id, matchup);
            info!(
                "Publishing matchup {} for scope '{}'",
                event.matchup_id, event.scope_id
            );
            self.reply_publisher.publish_matchup_formed(event).await?;
        }

        Ok(batch)
    }

    fn matchup_event(scope_id: ScopeId, matchup: Matchup) -> MatchupFormed {
        MatchupFormed {
            matchup_id: generate_matchup_id(),
            scope_id,
            team1: matchup.team1,
            team2: matchup.team2,
            carried_over: matchup.leftover,
            timestamp: current_timestamp(),
        }
    }

    fn update_stats(&self, update: impl FnOnce(&mut QueueManagerStats)) -> Result<()> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| QueueError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
        update(&mut stats);
        Ok(())
    }

    /// Counters plus current totals across all scopes
    pub fn get_stats(&self) -> Result<QueueManagerStats> {
        let totals = self.store.totals()?;
        let mut stats = self
            .stats
            .read()
            .map_err(|_| QueueError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?
            .clone();

        stats.active_scopes = totals.scopes;
        stats.players_queued = totals.queued;
        stats.players_high_priority = totals.high_priority;
        Ok(stats)
    }
}
