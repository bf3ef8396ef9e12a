//! Tabular Q-learning: action selection and value updates.

use rand::Rng;

use crate::infra::Direction;

use super::qtable::{QKey, QTable};

/// Exploration-rate schedule across episodes.
#[derive(Debug, Clone, Copy)]
pub enum EpsilonSchedule {
    Constant(f64),
    /// `epsilon0 * (1 - e / epochs)`, non-increasing in `e`.
    Linear(f64),
}

impl EpsilonSchedule {
    pub fn at(&self, episode: u32, epochs: u32) -> f64 {
        match self {
            EpsilonSchedule::Constant(epsilon) => *epsilon,
            EpsilonSchedule::Linear(epsilon0) => {
                epsilon0 * (1.0 - episode as f64 / epochs.max(1) as f64)
            }
        }
    }
}

/// Q-learning update parameters.
#[derive(Debug, Clone, Copy)]
pub struct QLearning {
    pub alpha: f64,
    pub gamma: f64,
}

impl QLearning {
    /// Epsilon-greedy training selection. Exploits via the stored
    /// values (unseen states act as all-zero, so ties go horizontal).
    pub fn select<R: Rng>(
        &self,
        rng: &mut R,
        table: &QTable,
        key: &QKey,
        epsilon: f64,
    ) -> Direction {
        if rng.random::<f64>() < epsilon {
            if rng.random::<bool>() {
                Direction::Horizontal
            } else {
                Direction::Vertical
            }
        } else {
            table
                .lookup(key)
                .map(|values| values.best())
                .unwrap_or(Direction::Horizontal)
        }
    }

    /// Greedy inference selection; `None` for a never-visited state so
    /// the caller can fall back to its default policy.
    pub fn greedy(table: &QTable, key: &QKey) -> Option<Direction> {
        table.lookup(key).map(|values| values.best())
    }

    /// One-step temporal-difference update for an observed transition.
    pub fn update(
        &self,
        table: &mut QTable,
        key: &QKey,
        action: Direction,
        reward: f64,
        next: &QKey,
    ) {
        let next_max = table.lookup(next).map(|values| values.max()).unwrap_or(0.0);
        let values = table.entry(key.clone());
        let old = values.value(action);
        *values.value_mut(action) = old + self.alpha * (reward + self.gamma * next_max - old);
    }
}
