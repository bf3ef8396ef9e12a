//! Tabular Q-learning policy engine and episode management.
//!
//! The table maps `(intersection, discrete state)` to one value per
//! action; training runs epsilon-greedy episodes against the simulator
//! while priority preemption can force an intersection's action for a
//! cycle without disabling the value update. Inference replays the
//! persisted table greedily.

pub mod policy;
pub mod qtable;
pub mod reward;
pub mod run;
pub mod train;

pub use policy::{EpsilonSchedule, QLearning};
pub use qtable::{ActionValues, QKey, QTable};
pub use reward::{FlowRewardParams, flow_reward, queue_reward};
pub use run::GreedyRunner;
pub use train::{BestTracker, EpisodeOutcome, Trainer};
