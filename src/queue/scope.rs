//! Per-community queue state
//!
//! A scope holds the normal queue and the high-priority list for one
//! community. Every mutation keeps a user in at most one list, at most once.

use crate::error::{QueueError, Result};
use crate::types::{UserId, UserIdentity};
use serde::{Deserialize, Serialize};

/// Result of a join attempt against a single scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// User appended to the queue; carries the new queue size
    Enqueued { queue_len: usize },
    /// User already present in the queue or the high-priority list
    AlreadyQueued,
}

/// Which list a user was removed from, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    LeftQueue { queue_len: usize },
    LeftPriority { queue_len: usize },
    NotQueued,
}

/// Read-only view of a non-empty scope, in list order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub queue: Vec<String>,
    pub high_priority: Vec<String>,
}

/// Queue state for one community
#[derive(Debug, Clone, Default)]
pub struct ScopeQueue {
    queue: Vec<UserIdentity>,
    high_priority: Vec<UserIdentity>,
}

impl ScopeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from explicit lists, rejecting any repeated user
    pub fn from_parts(queue: Vec<UserIdentity>, high_priority: Vec<UserIdentity>) -> Result<Self> {
        let mut scope = Self::new();

        for user in high_priority {
            if scope.contains(&user.id) {
                return Err(QueueError::DuplicateMember { user_id: user.id }.into());
            }
            scope.high_priority.push(user);
        }
        for user in queue {
            if scope.contains(&user.id) {
                return Err(QueueError::DuplicateMember { user_id: user.id }.into());
            }
            scope.queue.push(user);
        }

        Ok(scope)
    }

    /// Whether the user is in either list
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.queue.iter().any(|u| &u.id == user_id)
            || self.high_priority.iter().any(|u| &u.id == user_id)
    }

    /// Append a user to the queue unless they are already waiting
    pub fn enqueue(&mut self, user: UserIdentity) -> EnqueueOutcome {
        if self.contains(&user.id) {
            return EnqueueOutcome::AlreadyQueued;
        }

        self.queue.push(user);
        EnqueueOutcome::Enqueued {
            queue_len: self.queue.len(),
        }
    }

    /// Remove a user from whichever list holds them
    pub fn remove(&mut self, user_id: &UserId) -> LeaveOutcome {
        if let Some(index) = self.queue.iter().position(|u| &u.id == user_id) {
            self.queue.remove(index);
            return LeaveOutcome::LeftQueue {
                queue_len: self.queue.len(),
            };
        }

        if let Some(index) = self.high_priority.iter().position(|u| &u.id == user_id) {
            self.high_priority.remove(index);
            return LeaveOutcome::LeftPriority {
                queue_len: self.queue.len(),
            };
        }

        LeaveOutcome::NotQueued
    }

    /// Labels of both lists, or `None` when nobody is waiting
    pub fn snapshot(&self) -> Option<QueueSnapshot> {
        if self.is_empty() {
            return None;
        }

        Some(QueueSnapshot {
            queue: self.queue.iter().map(|u| u.label.clone()).collect(),
            high_priority: self.high_priority.iter().map(|u| u.label.clone()).collect(),
        })
    }

    /// Empty both lists
    pub fn clear(&mut self) {
        self.queue.clear();
        self.high_priority.clear();
    }

    /// Combined size of the queue and the high-priority list
    pub fn population(&self) -> usize {
        self.queue.len() + self.high_priority.len()
    }

    pub fn is_empty(&self) -> bool {
        self.population() == 0
    }

    pub fn queue(&self) -> &[UserIdentity] {
        &self.queue
    }

    pub fn high_priority(&self) -> &[UserIdentity] {
        &self.high_priority
    }

    /// Take every waiting user, high-priority first, leaving both lists empty
    pub(crate) fn drain_pool(&mut self) -> Vec<UserIdentity> {
        let mut pool = std::mem::take(&mut self.high_priority);
        pool.append(&mut self.queue);
        pool
    }

    /// Replace the high-priority list with users carried over from a matchup
    pub(crate) fn promote(&mut self, carried_over: Vec<UserIdentity>) {
        debug_assert!(self.queue.is_empty() && self.high_priority.is_empty());
        self.high_priority = carried_over;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u32) -> UserIdentity {
        UserIdentity::new(n.to_string(), format!("@user{}", n))
    }

    #[test]
    fn test_enqueue_preserves_arrival_order() {
        let mut scope = ScopeQueue::new();
        assert_eq!(scope.enqueue(user(1)), EnqueueOutcome::Enqueued { queue_len: 1 });
        assert_eq!(scope.enqueue(user(2)), EnqueueOutcome::Enqueued { queue_len: 2 });

        let ids: Vec<_> = scope.queue().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_duplicate_join_is_declined() {
        let mut scope = ScopeQueue::new();
        scope.enqueue(user(1));

        assert_eq!(scope.enqueue(user(1)), EnqueueOutcome::AlreadyQueued);
        // A new label does not make it a different user
        assert_eq!(
            scope.enqueue(UserIdentity::new("1", "@renamed")),
            EnqueueOutcome::AlreadyQueued
        );
        assert_eq!(scope.population(), 1);
    }

    #[test]
    fn test_priority_member_cannot_rejoin_queue() {
        let mut scope = ScopeQueue::from_parts(vec![], vec![user(9)]).unwrap();
        assert_eq!(scope.enqueue(user(9)), EnqueueOutcome::AlreadyQueued);
        assert!(scope.queue().is_empty());
    }

    #[test]
    fn test_remove_from_each_list() {
        let mut scope =
            ScopeQueue::from_parts(vec![user(1), user(2), user(3)], vec![user(4)]).unwrap();

        assert_eq!(scope.remove(&"2".to_string()), LeaveOutcome::LeftQueue { queue_len: 2 });
        assert_eq!(
            scope.remove(&"4".to_string()),
            LeaveOutcome::LeftPriority { queue_len: 2 }
        );
        assert_eq!(scope.remove(&"4".to_string()), LeaveOutcome::NotQueued);

        let ids: Vec<_> = scope.queue().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_snapshot_and_clear() {
        let mut scope = ScopeQueue::new();
        assert!(scope.snapshot().is_none());

        scope.enqueue(user(1));
        let snapshot = scope.snapshot().unwrap();
        assert_eq!(snapshot.queue, vec!["@user1".to_string()]);
        assert!(snapshot.high_priority.is_empty());

        scope.clear();
        assert!(scope.snapshot().is_none());
        scope.clear();
        assert!(scope.is_empty());
    }

    #[test]
    fn test_from_parts_rejects_duplicates() {
        assert!(ScopeQueue::from_parts(vec![user(1), user(1)], vec![]).is_err());
        assert!(ScopeQueue::from_parts(vec![user(1)], vec![user(1)]).is_err());
        assert!(ScopeQueue::from_parts(vec![user(1)], vec![user(2)]).is_ok());
    }

    #[test]
    fn test_drain_pool_lists_priority_first() {
        let mut scope = ScopeQueue::from_parts(vec![user(1), user(2)], vec![user(3)]).unwrap();
        let pool = scope.drain_pool();

        let ids: Vec<_> = pool.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert!(scope.is_empty());
    }
}
