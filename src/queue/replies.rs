//! Reply texts delivered to a scope's channel

use crate::queue::matchup::Matchup;
use crate::queue::scope::QueueSnapshot;
use crate::types::UserIdentity;
use crate::utils::join_labels;

pub fn joined(user: &UserIdentity, queue_len: usize) -> String {
    format!("{} has joined the queue. Total in queue: {}", user, queue_len)
}

pub fn already_queued(user: &UserIdentity) -> String {
    format!("{}, you are already in the queue or high-priority list.", user)
}

pub fn left_queue(user: &UserIdentity, queue_len: usize) -> String {
    format!("{} has left the queue. Total in queue: {}", user, queue_len)
}

pub fn left_priority(user: &UserIdentity, queue_len: usize) -> String {
    format!(
        "{} has left the high-priority list. Total in queue: {}",
        user, queue_len
    )
}

pub fn not_queued(user: &UserIdentity) -> String {
    format!("{}, you are not in the queue or high-priority list.", user)
}

pub fn cleared() -> String {
    "The queue and high-priority list have been cleared.".to_string()
}

/// Queue listing, plus the priority listing only when it has members
pub fn status(snapshot: Option<&QueueSnapshot>) -> Vec<String> {
    let Some(snapshot) = snapshot else {
        return vec!["The queue is currently empty.".to_string()];
    };

    let mut messages = vec![format!(
        "Queue ({}): {}",
        snapshot.queue.len(),
        join_labels(snapshot.queue.iter().map(String::as_str), ", ")
    )];

    if !snapshot.high_priority.is_empty() {
        messages.push(format!(
            "High-Priority List ({}): {}",
            snapshot.high_priority.len(),
            join_labels(snapshot.high_priority.iter().map(String::as_str), ", ")
        ));
    }

    messages
}

/// Announcement, both rosters, and the carry-over notice if anyone was left out
pub fn matchup(matchup: &Matchup) -> Vec<String> {
    let roster = |team: &[UserIdentity]| join_labels(team.iter().map(|u| u.label.as_str()), "\n");

    let mut messages = vec![
        "Teams are ready!".to_string(),
        format!("**Team 1:**\n{}", roster(&matchup.team1)),
        format!("**Team 2:**\n{}", roster(&matchup.team2)),
    ];

    if matchup.has_leftover() {
        messages.push(format!(
            "The following users are on the high-priority list for the next match:\n{}",
            join_labels(matchup.leftover.iter().map(|u| u.label.as_str()), ", ")
        ));
    }

    messages
}
