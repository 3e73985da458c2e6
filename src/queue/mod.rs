//! Per-community queues and random team formation
//!
//! Each scope owns a normal queue and a high-priority list. Joining the
//! twelfth user drains both into one pool, shuffles it, and splits the first
//! twelve into two teams of six; anyone past the cut is promoted to the
//! high-priority list for the next match.

pub mod manager;
pub mod matchup;
pub mod replies;
pub mod scope;
pub mod store;

pub use manager::{CommandOutcome, QueueManager, QueueManagerStats};
pub use matchup::{Matchup, MatchupEngine};
pub use scope::{EnqueueOutcome, LeaveOutcome, QueueSnapshot, ScopeQueue};
pub use store::{JoinOutcome, QueueStore, StoreTotals};
