//! Scope registry with one mutual-exclusion boundary per community

use crate::error::{QueueError, Result};
use crate::queue::matchup::{Matchup, MatchupEngine};
use crate::queue::scope::{EnqueueOutcome, LeaveOutcome, QueueSnapshot, ScopeQueue};
use crate::types::{ScopeId, UserId, UserIdentity};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

/// Result of a join routed through the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// User was queued; `queue_len` is the queue size right after the append.
    /// `matchup` is set when this join pushed the scope over the threshold.
    Joined {
        queue_len: usize,
        matchup: Option<Matchup>,
    },
    AlreadyQueued,
}

/// Totals across all scopes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreTotals {
    pub scopes: usize,
    pub queued: usize,
    pub high_priority: usize,
}

/// All community scopes, created lazily on first use
#[derive(Debug, Default)]
pub struct QueueStore {
    scopes: RwLock<HashMap<ScopeId, Arc<Mutex<ScopeQueue>>>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the scope handle, creating an empty scope if absent
    fn scope(&self, scope_id: &str) -> Result<Arc<Mutex<ScopeQueue>>> {
        {
            let scopes = self
                .scopes
                .read()
                .map_err(|_| QueueError::InternalError {
                    message: "Failed to acquire scopes lock".to_string(),
                })?;
            if let Some(scope) = scopes.get(scope_id) {
                return Ok(scope.clone());
            }
        }

        let mut scopes = self
            .scopes
            .write()
            .map_err(|_| QueueError::InternalError {
                message: "Failed to acquire scopes lock".to_string(),
            })?;

        let scope = scopes.entry(scope_id.to_string()).or_insert_with(|| {
            info!("Created queue scope '{}'", scope_id);
            Arc::new(Mutex::new(ScopeQueue::new()))
        });
        Ok(scope.clone())
    }

    fn lock(scope: &Mutex<ScopeQueue>) -> Result<MutexGuard<'_, ScopeQueue>> {
        scope.lock().map_err(|_| {
            QueueError::InternalError {
                message: "Failed to acquire scope lock".to_string(),
            }
            .into()
        })
    }

    /// Queue a user and form a matchup if the scope reaches the threshold.
    ///
    /// The append, the threshold check and the formation all happen under the
    /// scope's lock, so concurrent joins cannot both trigger a matchup.
    pub fn join(
        &self,
        scope_id: &str,
        user: UserIdentity,
        engine: &MatchupEngine,
    ) -> Result<JoinOutcome> {
        let handle = self.scope(scope_id)?;
        let mut scope = Self::lock(&handle)?;

        match scope.enqueue(user) {
            EnqueueOutcome::AlreadyQueued => Ok(JoinOutcome::AlreadyQueued),
            EnqueueOutcome::Enqueued { queue_len } => {
                let matchup = engine.try_form(&mut scope);
                if matchup.is_some() {
                    debug!(
                        "Scope '{}' reached {} users, matchup formed",
                        scope_id,
                        engine.config().match_size
                    );
                }
                Ok(JoinOutcome::Joined { queue_len, matchup })
            }
        }
    }

    pub fn leave(&self, scope_id: &str, user_id: &UserId) -> Result<LeaveOutcome> {
        let handle = self.scope(scope_id)?;
        let mut scope = Self::lock(&handle)?;
        Ok(scope.remove(user_id))
    }

    pub fn status(&self, scope_id: &str) -> Result<Option<QueueSnapshot>> {
        let handle = self.scope(scope_id)?;
        let scope = Self::lock(&handle)?;
        Ok(scope.snapshot())
    }

    pub fn clear(&self, scope_id: &str) -> Result<()> {
        let handle = self.scope(scope_id)?;
        let mut scope = Self::lock(&handle)?;
        scope.clear();
        Ok(())
    }

    /// Copy of a scope's current state, for inspection and tests
    pub fn scope_state(&self, scope_id: &str) -> Result<ScopeQueue> {
        let handle = self.scope(scope_id)?;
        let scope = Self::lock(&handle)?;
        Ok(scope.clone())
    }

    pub fn totals(&self) -> Result<StoreTotals> {
        let handles: Vec<_> = {
            let scopes = self
                .scopes
                .read()
                .map_err(|_| QueueError::InternalError {
                    message: "Failed to acquire scopes lock".to_string(),
                })?;
            scopes.values().cloned().collect()
        };

        let mut totals = StoreTotals {
            scopes: handles.len(),
            ..StoreTotals::default()
        };
        for handle in handles {
            let scope = Self::lock(&handle)?;
            totals.queued += scope.queue().len();
            totals.high_priority += scope.high_priority().len();
        }

        Ok(totals)
    }
}
