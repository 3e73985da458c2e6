//! Matchup sizing configuration

use crate::error::{QueueError, Result};
use serde::{Deserialize, Serialize};

/// How many users a matchup consumes and how they are split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Users selected per matchup; also the population that triggers formation
    pub match_size: usize,
    /// Users per team
    pub team_size: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_size: 12,
            team_size: 6,
        }
    }
}

impl MatchConfig {
    pub fn new(match_size: usize, team_size: usize) -> Result<Self> {
        let config = Self {
            match_size,
            team_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Two teams must exactly fill a matchup
    pub fn validate(&self) -> Result<()> {
        if self.team_size == 0 {
            return Err(QueueError::ConfigurationError {
                message: "Team size must be greater than 0".to_string(),
            }
            .into());
        }

        if self.match_size != self.team_size * 2 {
            return Err(QueueError::ConfigurationError {
                message: format!(
                    "Match size {} must be exactly two teams of {}",
                    self.match_size, self.team_size
                ),
            }
            .into());
        }

        Ok(())
    }
}
