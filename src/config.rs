//! Environment-driven configuration.
//!
//! All knobs are read from `GW_*` environment variables (a `.env` file
//! is honoured via dotenv in `main`). Every struct has sane defaults so
//! only the simulator host and scenario are mandatory.

use std::env;
use std::str::FromStr;

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.parse::<T>().ok())
}

/// State/reward profile. `Local` keys the table on per-intersection
/// queue buckets only and scores with the queue reward; `Global` adds
/// the network-wide observations and scores with the flow reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Local,
    Global,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Local => "local",
            Profile::Global => "global",
        }
    }

    fn from_env() -> Self {
        match env::var("GW_PROFILE").as_deref() {
            Ok("local") => Profile::Local,
            _ => Profile::Global,
        }
    }
}

/// Connection settings for the external simulation engine.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub host: String,
    pub scenario: String,
    pub step_length: f64,
}

impl SimConfig {
    /// Reads the simulator endpoint from the environment. The host and
    /// scenario are required; a missing scenario is fatal before any
    /// session can be opened.
    pub fn from_env() -> Self {
        let host =
            env::var("GW_SIM_HOST").expect("GW_SIM_HOST environment variable is required");
        let scenario =
            env::var("GW_SCENARIO").expect("GW_SCENARIO environment variable is required");
        let step_length = env_parse("GW_STEP_LENGTH").unwrap_or(1.0);

        Self {
            host,
            scenario,
            step_length,
        }
    }
}

/// Per-intersection control settings: which signals we own and how long
/// each phase of the state machine is held.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub intersections: Vec<String>,
    pub green_duration: u32,
    pub yellow_duration: u32,
    /// 0 disables the all-red clearance phase.
    pub all_red_duration: u32,
    pub profile: Profile,
    /// Speed below which a vehicle counts as halted.
    pub halt_speed: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            intersections: vec!["B2".to_string(), "C2".to_string(), "D2".to_string()],
            green_duration: 15,
            yellow_duration: 2,
            all_red_duration: 0,
            profile: Profile::Global,
            halt_speed: 0.1,
        }
    }
}

impl ControlConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let intersections = env::var("GW_INTERSECTIONS")
            .map(|val| {
                val.split(',')
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.intersections);

        Self {
            intersections,
            green_duration: env_parse("GW_GREEN_DURATION").unwrap_or(defaults.green_duration),
            yellow_duration: env_parse("GW_YELLOW_DURATION").unwrap_or(defaults.yellow_duration),
            all_red_duration: env_parse("GW_ALL_RED_DURATION")
                .unwrap_or(defaults.all_red_duration),
            profile: Profile::from_env(),
            halt_speed: env_parse("GW_HALT_SPEED").unwrap_or(defaults.halt_speed),
        }
    }
}

/// Q-learning hyperparameters and the episode budget.
#[derive(Debug, Clone)]
pub struct LearnConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    /// Linearly decay epsilon across episodes; constant when false.
    pub epsilon_decay: bool,
    pub epochs: u32,
    pub max_steps: u64,
    /// Episodes without improvement before training stops early.
    pub patience: u32,
    /// Waiting time above which a vehicle counts as starved.
    pub starvation_threshold: f64,
    pub table_path: String,
    /// Fixed RNG seed for reproducible exploration.
    pub seed: Option<u64>,
}

impl Default for LearnConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            gamma: 0.9,
            epsilon: 0.9,
            epsilon_decay: true,
            epochs: 100,
            max_steps: 5000,
            patience: 100,
            starvation_threshold: 250.0,
            table_path: "q_table.gw".to_string(),
            seed: None,
        }
    }
}

impl LearnConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            alpha: env_parse("GW_ALPHA").unwrap_or(defaults.alpha),
            gamma: env_parse("GW_GAMMA").unwrap_or(defaults.gamma),
            epsilon: env_parse("GW_EPSILON").unwrap_or(defaults.epsilon),
            epsilon_decay: env_parse("GW_EPSILON_DECAY").unwrap_or(defaults.epsilon_decay),
            epochs: env_parse("GW_EPOCHS").unwrap_or(defaults.epochs),
            max_steps: env_parse("GW_MAX_STEPS").unwrap_or(defaults.max_steps),
            patience: env_parse("GW_PATIENCE").unwrap_or(defaults.patience),
            starvation_threshold: env_parse("GW_STARVATION_THRESHOLD")
                .unwrap_or(defaults.starvation_threshold),
            table_path: env::var("GW_TABLE_PATH").unwrap_or(defaults.table_path),
            seed: env_parse("GW_SEED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_defaults_match_scenario() {
        let config = ControlConfig::default();
        assert_eq!(config.intersections.len(), 3);
        assert_eq!(config.green_duration, 15);
        assert_eq!(config.yellow_duration, 2);
        assert_eq!(config.all_red_duration, 0);
        assert_eq!(config.profile, Profile::Global);
    }

    #[test]
    fn learn_defaults() {
        let config = LearnConfig::default();
        assert!((config.alpha - 0.05).abs() < 1e-12);
        assert!((config.gamma - 0.9).abs() < 1e-12);
        assert_eq!(config.epochs, 100);
        assert_eq!(config.max_steps, 5000);
    }
}
