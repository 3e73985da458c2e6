//! Concurrency tests for command processing
//!
//! Many tasks hammer the same community at once; the per-scope lock must keep
//! membership unique and form exactly one matchup per full pool.

mod fixtures;

use fixtures::{create_test_system, join, leave, published_matchups};
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_24_concurrent_joins_form_two_matchups() {
    let (manager, publisher) = create_test_system(17);

    let tasks: Vec<_> = (0..24)
        .map(|n| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.handle_command(join("guild", n)).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let matchups = published_matchups(&publisher);
    assert_eq!(matchups.len(), 2);

    let matched: HashSet<_> = matchups
        .iter()
        .flat_map(|m| m.team1.iter().chain(&m.team2))
        .map(|u| u.id.clone())
        .collect();
    assert_eq!(matched.len(), 24, "nobody is placed on two teams");
    assert!(manager.store().scope_state("guild").unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_25_concurrent_joins_leave_one_waiting() {
    let (manager, publisher) = create_test_system(18);

    let tasks: Vec<_> = (0..25)
        .map(|n| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.handle_command(join("guild", n)).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(published_matchups(&publisher).len(), 2);

    let scope = manager.store().scope_state("guild").unwrap();
    assert_eq!(scope.queue().len(), 1);
    assert!(scope.high_priority().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_joins_queue_once() {
    let (manager, _) = create_test_system(19);

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.handle_command(join("guild", 7)).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let stats = manager.get_stats().unwrap();
    assert_eq!(stats.joins, 1);
    assert_eq!(stats.duplicate_joins, 19);
    assert_eq!(manager.store().scope_state("guild").unwrap().population(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_joins_and_leaves_across_scopes() {
    let (manager, _) = create_test_system(20);
    let scopes = ["guild-a", "guild-b", "guild-c"];

    let start_time = Instant::now();

    let tasks: Vec<_> = (0..300u32)
        .map(|i| {
            let manager = manager.clone();
            let scope = scopes[(i % 3) as usize];
            let user = i % 10;
            tokio::spawn(async move {
                if i % 4 == 3 {
                    manager.handle_command(leave(scope, user)).await
                } else {
                    manager.handle_command(join(scope, user)).await
                }
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let elapsed = start_time.elapsed();
    assert!(
        elapsed < Duration::from_secs(5),
        "300 commands took {:?}",
        elapsed
    );

    for scope in scopes {
        let state = manager.store().scope_state(scope).unwrap();
        let mut seen = HashSet::new();
        for user in state.queue().iter().chain(state.high_priority()) {
            assert!(seen.insert(user.id.clone()), "{} listed twice", user.id);
        }
        // Ten distinct users can never reach a full pool
        assert!(state.population() <= 10);
    }

    assert_eq!(manager.get_stats().unwrap().commands_processed, 300);
}
