//! Shared builders and helpers for the integration tests

#![allow(dead_code)]

use scrim_queue::amqp::MockReplyPublisher;
use scrim_queue::config::MatchConfig;
use scrim_queue::metrics::MetricsCollector;
use scrim_queue::queue::{MatchupEngine, QueueManager};
use scrim_queue::types::{CommandRequest, MatchupFormed, QueueCommand, QueueEvent, ReplyBatch, UserIdentity};
use std::sync::Arc;

/// A user with id `n` and a mention-style label
pub fn user(n: u32) -> UserIdentity {
    UserIdentity::new(n.to_string(), format!("<@{}>", n))
}

pub fn join(scope: &str, n: u32) -> CommandRequest {
    CommandRequest::new(scope, QueueCommand::Join { user: user(n) })
}

pub fn leave(scope: &str, n: u32) -> CommandRequest {
    CommandRequest::new(scope, QueueCommand::Leave { user: user(n) })
}

pub fn status(scope: &str) -> CommandRequest {
    CommandRequest::new(scope, QueueCommand::Status)
}

pub fn clear(scope: &str) -> CommandRequest {
    CommandRequest::new(scope, QueueCommand::Clear)
}

/// Queue manager with a seeded engine and a capturing publisher
pub fn create_test_system(seed: u64) -> (Arc<QueueManager>, Arc<MockReplyPublisher>) {
    create_test_system_with(MatchConfig::default(), seed)
}

pub fn create_test_system_with(
    config: MatchConfig,
    seed: u64,
) -> (Arc<QueueManager>, Arc<MockReplyPublisher>) {
    let publisher = Arc::new(MockReplyPublisher::new());
    let manager = Arc::new(QueueManager::with_engine(
        MatchupEngine::with_seed(config, seed),
        publisher.clone(),
        Arc::new(MetricsCollector::default()),
    ));
    (manager, publisher)
}

/// Every matchup event the publisher has seen, in order
pub fn published_matchups(publisher: &MockReplyPublisher) -> Vec<MatchupFormed> {
    publisher
        .get_published_events()
        .into_iter()
        .filter_map(|event| match event {
            QueueEvent::MatchupFormed(matchup) => Some(matchup),
            QueueEvent::ReplyBatch(_) => None,
        })
        .collect()
}

/// Every reply batch the publisher has seen, in order
pub fn published_replies(publisher: &MockReplyPublisher) -> Vec<ReplyBatch> {
    publisher
        .get_published_events()
        .into_iter()
        .filter_map(|event| match event {
            QueueEvent::ReplyBatch(batch) => Some(batch),
            QueueEvent::MatchupFormed(_) => None,
        })
        .collect()
}
