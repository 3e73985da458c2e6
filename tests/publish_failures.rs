//! Publisher failure handling in the queue manager

mod fixtures;

use async_trait::async_trait;
use fixtures::{join, user};
use mockall::mock;
use scrim_queue::config::MatchConfig;
use scrim_queue::error::{QueueError, Result};
use scrim_queue::metrics::MetricsCollector;
use scrim_queue::queue::{MatchupEngine, QueueManager};
use scrim_queue::types::{MatchupFormed, ReplyBatch};
use scrim_queue::ReplyPublisher;
use std::sync::Arc;

mock! {
    pub Publisher {}

    #[async_trait]
    impl ReplyPublisher for Publisher {
        async fn publish_replies(&self, batch: ReplyBatch) -> Result<()>;
        async fn publish_matchup_formed(&self, event: MatchupFormed) -> Result<()>;
    }
}

fn manager_with(publisher: MockPublisher) -> QueueManager {
    QueueManager::with_engine(
        MatchupEngine::with_seed(MatchConfig::default(), 4),
        Arc::new(publisher),
        Arc::new(MetricsCollector::default()),
    )
}

fn broker_down() -> anyhow::Error {
    QueueError::AmqpConnectionFailed {
        message: "broker unreachable".to_string(),
    }
    .into()
}

#[tokio::test]
async fn test_failed_reply_keeps_state_change() {
    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish_replies()
        .times(1)
        .returning(|_| Err(broker_down()));
    publisher.expect_publish_matchup_formed().never();

    let manager = manager_with(publisher);
    let result = manager.handle_command(join("guild", 1)).await;

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<QueueError>(),
        Some(QueueError::AmqpConnectionFailed { .. })
    ));
    // The join was applied before publishing and is not rolled back
    assert!(manager.store().scope_state("guild").unwrap().contains(&user(1).id));
}

#[tokio::test]
async fn test_failed_matchup_event_after_replies() {
    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish_replies()
        .times(12)
        .returning(|_| Ok(()));
    publisher
        .expect_publish_matchup_formed()
        .times(1)
        .withf(|event| event.team1.len() == 6 && event.team2.len() == 6)
        .returning(|_| Err(broker_down()));

    let manager = manager_with(publisher);
    for n in 0..11 {
        manager.handle_command(join("guild", n)).await.unwrap();
    }

    assert!(manager.handle_command(join("guild", 11)).await.is_err());

    let stats = manager.get_stats().unwrap();
    assert_eq!(stats.matchups_formed, 1);
    assert_eq!(stats.players_queued, 0);
}

#[tokio::test]
async fn test_reply_batch_reaches_publisher_in_order() {
    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish_replies()
        .times(1)
        .withf(|batch| {
            batch.scope_id == "guild"
                && batch.command == "join"
                && batch.messages == vec!["<@3> has joined the queue. Total in queue: 1"]
        })
        .returning(|_| Ok(()));

    let manager = manager_with(publisher);
    manager.handle_command(join("guild", 3)).await.unwrap();
}
