//! Integration tests for the scrim-queue service
//!
//! These tests drive the queue manager the way the AMQP consumer does:
//! - Filling a community's queue up to a matchup
//! - Priority carry-over into the next round
//! - Duplicate joins and leaves of absent users
//! - Clearing and scope isolation
//! - Published reply batches and matchup events

mod fixtures;

use fixtures::{
    clear, create_test_system, join, leave, published_matchups, published_replies, status, user,
};
use scrim_queue::config::MatchConfig;
use scrim_queue::queue::{MatchupEngine, ScopeQueue};
use std::collections::HashSet;

#[tokio::test]
async fn test_eleven_joins_then_twelfth_forms_teams() {
    let (manager, publisher) = create_test_system(7);

    for n in 0..11 {
        let batch = manager.handle_command(join("guild", n)).await.unwrap();
        assert_eq!(batch.messages.len(), 1);
    }

    let batch = manager.handle_command(status("guild")).await.unwrap();
    assert_eq!(batch.messages.len(), 1, "no priority line while the list is empty");
    assert!(batch.messages[0].starts_with("Queue (11): <@0>, <@1>"));
    assert!(published_matchups(&publisher).is_empty());

    let batch = manager.handle_command(join("guild", 11)).await.unwrap();
    assert_eq!(batch.command, "join");
    assert_eq!(batch.messages.len(), 4);
    assert_eq!(batch.messages[0], "<@11> has joined the queue. Total in queue: 12");
    assert_eq!(batch.messages[1], "Teams are ready!");

    let roster_size: usize = batch.messages[2..]
        .iter()
        .map(|message| message.lines().skip(1).count())
        .sum();
    assert_eq!(roster_size, 12);

    let matchups = published_matchups(&publisher);
    assert_eq!(matchups.len(), 1);
    assert_eq!(matchups[0].scope_id, "guild");
    assert_eq!(matchups[0].team1.len(), 6);
    assert_eq!(matchups[0].team2.len(), 6);
    assert!(matchups[0].carried_over.is_empty());

    let batch = manager.handle_command(status("guild")).await.unwrap();
    assert_eq!(batch.messages, vec!["The queue is currently empty."]);
}

#[tokio::test]
async fn test_leave_of_absent_user_changes_nothing() {
    let (manager, publisher) = create_test_system(1);
    for n in 0..3 {
        manager.handle_command(join("guild", n)).await.unwrap();
    }
    let before = manager.store().scope_state("guild").unwrap();

    let batch = manager.handle_command(leave("guild", 99)).await.unwrap();
    assert_eq!(
        batch.messages,
        vec!["<@99>, you are not in the queue or high-priority list."]
    );

    let after = manager.store().scope_state("guild").unwrap();
    assert_eq!(before.queue(), after.queue());
    assert_eq!(before.high_priority(), after.high_priority());
    assert_eq!(published_replies(&publisher).len(), 4);
}

#[tokio::test]
async fn test_duplicate_join_is_declined() {
    let (manager, _) = create_test_system(1);
    manager.handle_command(join("guild", 5)).await.unwrap();

    let batch = manager.handle_command(join("guild", 5)).await.unwrap();
    assert_eq!(
        batch.messages,
        vec!["<@5>, you are already in the queue or high-priority list."]
    );
    assert_eq!(manager.store().scope_state("guild").unwrap().population(), 1);
}

#[tokio::test]
async fn test_leave_keeps_remaining_order() {
    let (manager, _) = create_test_system(1);
    for n in 1..=4 {
        manager.handle_command(join("guild", n)).await.unwrap();
    }

    let batch = manager.handle_command(leave("guild", 2)).await.unwrap();
    assert_eq!(batch.messages, vec!["<@2> has left the queue. Total in queue: 3"]);

    let batch = manager.handle_command(status("guild")).await.unwrap();
    assert_eq!(batch.messages, vec!["Queue (3): <@1>, <@3>, <@4>"]);
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let (manager, _) = create_test_system(1);
    for n in 0..5 {
        manager.handle_command(join("guild", n)).await.unwrap();
    }

    for _ in 0..2 {
        let batch = manager.handle_command(clear("guild")).await.unwrap();
        assert_eq!(
            batch.messages,
            vec!["The queue and high-priority list have been cleared."]
        );
        assert!(manager.store().scope_state("guild").unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_scopes_are_isolated() {
    let (manager, publisher) = create_test_system(3);

    for n in 0..11 {
        manager.handle_command(join("guild-a", n)).await.unwrap();
    }
    // Filling another community does not push guild-a over the threshold
    for n in 0..11 {
        manager.handle_command(join("guild-b", n)).await.unwrap();
    }
    assert!(published_matchups(&publisher).is_empty());

    manager.handle_command(clear("guild-b")).await.unwrap();
    assert_eq!(manager.store().scope_state("guild-a").unwrap().population(), 11);

    let stats = manager.get_stats().unwrap();
    assert_eq!(stats.active_scopes, 2);
    assert_eq!(stats.players_queued, 11);
}

#[tokio::test]
async fn test_queue_restarts_after_matchup() {
    let (manager, publisher) = create_test_system(42);

    for n in 0..12 {
        manager.handle_command(join("guild", n)).await.unwrap();
    }
    assert_eq!(published_matchups(&publisher).len(), 1);

    // Matched users are no longer waiting and may queue again
    let batch = manager.handle_command(join("guild", 3)).await.unwrap();
    assert_eq!(batch.messages, vec!["<@3> has joined the queue. Total in queue: 1"]);
    manager.handle_command(join("guild", 100)).await.unwrap();

    let batch = manager.handle_command(status("guild")).await.unwrap();
    assert_eq!(batch.messages, vec!["Queue (2): <@3>, <@100>"]);
}

#[test]
fn test_oversized_pool_carries_leftover_into_priority() {
    let engine = MatchupEngine::with_seed(MatchConfig::default(), 42);
    let pool: Vec<_> = (0..15).map(user).collect();
    let mut scope = ScopeQueue::from_parts(pool[2..].to_vec(), pool[..2].to_vec()).unwrap();

    let matchup = engine.try_form(&mut scope).unwrap();
    assert_eq!(matchup.leftover.len(), 3);
    assert!(scope.queue().is_empty());
    assert_eq!(scope.high_priority(), matchup.leftover.as_slice());

    let messages = scrim_queue::queue::replies::matchup(&matchup);
    assert_eq!(messages.len(), 4);
    assert!(messages[3].starts_with("The following users are on the high-priority list"));

    let status = scrim_queue::queue::replies::status(scope.snapshot().as_ref());
    assert_eq!(status.len(), 2);
    assert_eq!(status[0], "Queue (0): ");
    assert!(status[1].starts_with("High-Priority List (3): "));
}

#[tokio::test]
async fn test_matchup_event_matches_rosters() {
    let (manager, publisher) = create_test_system(11);

    let mut last = None;
    for n in 0..12 {
        last = Some(manager.handle_command(join("guild", n)).await.unwrap());
    }
    let batch = last.unwrap();

    let matchup = published_matchups(&publisher).remove(0);
    let team1: Vec<_> = matchup.team1.iter().map(|u| u.label.clone()).collect();
    let team2: Vec<_> = matchup.team2.iter().map(|u| u.label.clone()).collect();
    assert_eq!(batch.messages[2], format!("**Team 1:**\n{}", team1.join("\n")));
    assert_eq!(batch.messages[3], format!("**Team 2:**\n{}", team2.join("\n")));

    let everyone: HashSet<_> = matchup
        .team1
        .iter()
        .chain(&matchup.team2)
        .map(|u| u.id.clone())
        .collect();
    assert_eq!(everyone.len(), 12);
}

#[tokio::test]
async fn test_reply_channel_is_echoed() {
    let (manager, publisher) = create_test_system(1);

    let request = status("guild").with_reply_channel("channel-77");
    manager.handle_command(request).await.unwrap();

    let replies = published_replies(&publisher);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].reply_channel.as_deref(), Some("channel-77"));
    assert_eq!(replies[0].command, "status");
}

#[tokio::test]
async fn test_stats_track_command_history() {
    let (manager, _) = create_test_system(9);

    for n in 0..12 {
        manager.handle_command(join("guild", n)).await.unwrap();
    }
    manager.handle_command(join("guild", 20)).await.unwrap();
    manager.handle_command(join("guild", 20)).await.unwrap();
    manager.handle_command(leave("guild", 20)).await.unwrap();

    let stats = manager.get_stats().unwrap();
    assert_eq!(stats.commands_processed, 15);
    assert_eq!(stats.joins, 13);
    assert_eq!(stats.duplicate_joins, 1);
    assert_eq!(stats.leaves, 1);
    assert_eq!(stats.matchups_formed, 1);
    assert_eq!(stats.players_matched, 12);
    assert_eq!(stats.players_carried_over, 0);
    assert_eq!(stats.players_queued, 0);
}
