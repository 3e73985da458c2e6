//! Matchup formation
//!
//! Once a scope's combined population reaches the match size, the whole pool
//! (high-priority list followed by the queue) is shuffled uniformly. The first
//! `match_size` users become two teams; anyone left over is promoted to the
//! high-priority list for the next round. Priority only guarantees a place in
//! the shuffled pool, not a place on a team.

use crate::config::MatchConfig;
use crate::queue::scope::ScopeQueue;
use crate::types::UserIdentity;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Two teams plus the users who did not fit this round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub team1: Vec<UserIdentity>,
    pub team2: Vec<UserIdentity>,
    pub leftover: Vec<UserIdentity>,
}

impl Matchup {
    pub fn has_leftover(&self) -> bool {
        !self.leftover.is_empty()
    }

    /// Every user placed on a team
    pub fn selected(&self) -> impl Iterator<Item = &UserIdentity> {
        self.team1.iter().chain(self.team2.iter())
    }

    /// Every user involved, selected or not
    pub fn participants(&self) -> impl Iterator<Item = &UserIdentity> {
        self.selected().chain(self.leftover.iter())
    }
}

/// Forms matchups from a scope's pool using a seedable random source
#[derive(Debug)]
pub struct MatchupEngine {
    config: MatchConfig,
    rng: Mutex<ChaCha8Rng>,
}

impl MatchupEngine {
    /// Create an engine seeded from OS entropy
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Create an engine whose shuffles are reproducible
    pub fn with_seed(config: MatchConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Whether the scope holds enough users to form a matchup
    pub fn is_ready(&self, scope: &ScopeQueue) -> bool {
        scope.population() >= self.config.match_size
    }

    /// Form a matchup with the engine's own random source.
    ///
    /// Returns `None` and leaves the scope untouched when the population is
    /// below the match size.
    pub fn try_form(&self, scope: &mut ScopeQueue) -> Option<Matchup> {
        if !self.is_ready(scope) {
            return None;
        }

        // A panic mid-shuffle cannot leave the RNG in an invalid state
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.try_form_with_rng(scope, &mut *rng)
    }

    /// Form a matchup with a caller-supplied random source
    pub fn try_form_with_rng<R: Rng + ?Sized>(
        &self,
        scope: &mut ScopeQueue,
        rng: &mut R,
    ) -> Option<Matchup> {
        if !self.is_ready(scope) {
            return None;
        }

        let mut pool = scope.drain_pool();
        pool.shuffle(rng);

        let leftover = pool.split_off(self.config.match_size);
        let team2 = pool.split_off(self.config.team_size);
        let team1 = pool;

        debug!(
            "Partitioned pool - team1: {}, team2: {}, leftover: {}",
            team1.len(),
            team2.len(),
            leftover.len()
        );

        scope.promote(leftover.clone());

        Some(Matchup {
            team1,
            team2,
            leftover,
        })
    }
}
