//! Game-state counters: XP, streak, and lives.
//!
//! Counters change only through [`GameStateTracker::reward`]. XP never
//! decreases and lives never leave `[0, starting_lives]`.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;

/// Snapshot of the learner's game counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub lives: u32,
    pub streak: u32,
    pub xp: u32,
}

impl GameState {
    /// Check whether the learner has run out of lives.
    pub fn is_out_of_lives(&self) -> bool {
        self.lives == 0
    }
}

/// Result of applying one success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardOutcome {
    /// XP granted by this reward.
    pub xp_earned: u32,
    /// Lives removed by this penalty (0 when already at the floor).
    pub lives_lost: u32,
    /// True when the learner has no lives left after this call.
    pub lives_exhausted: bool,
}

/// Owns the game counters and applies the reward and penalty rules.
#[derive(Debug, Clone)]
pub struct GameStateTracker {
    state: GameState,
    xp_per_activity: u32,
}

impl GameStateTracker {
    /// Start a fresh run with full lives, zero streak and zero XP.
    pub fn new(rules: &GameConfig) -> Self {
        Self {
            state: GameState {
                lives: rules.starting_lives,
                streak: 0,
                xp: 0,
            },
            xp_per_activity: rules.xp_per_activity,
        }
    }

    /// Current counters.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Apply a success (XP and streak up) or a failure (streak reset, one life lost).
    pub fn reward(&mut self, is_success: bool) -> RewardOutcome {
        if is_success {
            self.state.xp = self.state.xp.saturating_add(self.xp_per_activity);
            self.state.streak = self.state.streak.saturating_add(1);
            return RewardOutcome {
                xp_earned: self.xp_per_activity,
                lives_lost: 0,
                lives_exhausted: self.state.is_out_of_lives(),
            };
        }

        let before = self.state.lives;
        self.state.streak = 0;
        self.state.lives = before.saturating_sub(1);
        let exhausted = self.state.is_out_of_lives();
        if exhausted {
            tracing::warn!(xp = self.state.xp, "learner is out of lives");
        }

        RewardOutcome {
            xp_earned: 0,
            lives_lost: before - self.state.lives,
            lives_exhausted: exhausted,
        }
    }
}
