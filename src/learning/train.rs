//! Episode and training management for the Q-learning controller.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{ControlConfig, LearnConfig, Profile};
use crate::control::{
    Discretizer, MetricsCollector, MovingAverage, PhaseController, PhaseTimings, PriorityDetector,
};
use crate::infra::{EpisodeObserver, SimControl, SimError, TrafficSim};

use super::policy::{EpsilonSchedule, QLearning};
use super::qtable::{QKey, QTable};
use super::reward::{FlowRewardParams, flow_reward, queue_reward};

/// Best-reward tracker with an improvement patience budget.
#[derive(Debug)]
pub struct BestTracker {
    best: f64,
    stale: u32,
    patience: u32,
}

impl BestTracker {
    pub fn new(patience: u32) -> Self {
        Self {
            best: f64::NEG_INFINITY,
            stale: 0,
            patience,
        }
    }

    /// Records an episode's total reward; true when it improved.
    pub fn record(&mut self, total_reward: f64) -> bool {
        if total_reward > self.best {
            self.best = total_reward;
            self.stale = 0;
            true
        } else {
            self.stale += 1;
            false
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn exhausted(&self) -> bool {
        self.stale >= self.patience
    }
}

/// Totals of one finished episode.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeOutcome {
    pub steps: u64,
    pub total_reward: f64,
}

/// Drives repeated training episodes against the simulator, decaying
/// exploration and stopping early when the best reward stalls.
pub struct Trainer {
    control: ControlConfig,
    learn: LearnConfig,
    policy: QLearning,
    schedule: EpsilonSchedule,
    rng: StdRng,
    observer: Box<dyn EpisodeObserver>,
}

impl Trainer {
    pub fn new(
        control: ControlConfig,
        learn: LearnConfig,
        observer: impl EpisodeObserver + 'static,
    ) -> Self {
        let policy = QLearning {
            alpha: learn.alpha,
            gamma: learn.gamma,
        };
        let schedule = if learn.epsilon_decay {
            EpsilonSchedule::Linear(learn.epsilon)
        } else {
            EpsilonSchedule::Constant(learn.epsilon)
        };
        let rng = match learn.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            control,
            learn,
            policy,
            schedule,
            rng,
            observer: Box::new(observer),
        }
    }

    fn timings(&self) -> PhaseTimings {
        PhaseTimings {
            green: self.control.green_duration,
            yellow: self.control.yellow_duration,
            all_red: self.control.all_red_duration,
        }
    }

    /// Runs the full training loop: one strictly sequential simulator
    /// session per episode, then persists the table.
    pub async fn train<C: SimControl>(
        &mut self,
        connection: &mut C,
        scenario: &str,
        step_length: f64,
    ) -> Result<QTable, Box<dyn std::error::Error>> {
        let mut table = QTable::new();
        let mut tracker = BestTracker::new(self.learn.patience);
        let mut recent = MovingAverage::new(10);
        let mut episodes_run = 0;

        for episode in 0..self.learn.epochs {
            let epsilon = self.schedule.at(episode, self.learn.epochs);
            self.observer.on_episode_start(episode, epsilon);

            let mut session = connection.open(scenario, step_length).await?;
            let outcome = match self.run_episode(&mut session, &mut table, epsilon).await {
                Ok(outcome) => {
                    C::close(session).await?;
                    outcome
                }
                Err(err) => {
                    // The engine holds one session at a time; release it
                    // even when the episode failed mid-run.
                    if let Err(close_err) = C::close(session).await {
                        tracing::warn!(
                            "Failed to close session after episode failure: {}",
                            close_err
                        );
                    }
                    return Err(err.into());
                }
            };

            episodes_run += 1;
            tracker.record(outcome.total_reward);
            recent.push(outcome.total_reward);
            self.observer.on_episode_end(
                episode,
                outcome.steps,
                outcome.total_reward,
                tracker.best(),
            );
            tracing::info!(
                "Episode {}/{}: steps {}, reward {:.2}, best {:.2}, recent avg {:.2}",
                episode + 1,
                self.learn.epochs,
                outcome.steps,
                outcome.total_reward,
                tracker.best(),
                recent.average(),
            );

            if tracker.exhausted() {
                tracing::info!(
                    "Early stop: no improvement in {} episodes",
                    self.learn.patience
                );
                break;
            }
        }

        self.observer.on_finished(episodes_run);
        table.save(
            Path::new(&self.learn.table_path),
            self.control.profile.as_str(),
        )?;
        Ok(table)
    }

    /// One bounded episode over an already-open session. Cycles until
    /// the simulator reports no further expected vehicles or the step
    /// budget runs out; budget exhaustion is normal termination.
    pub async fn run_episode<S: TrafficSim>(
        &mut self,
        sim: &mut S,
        table: &mut QTable,
        epsilon: f64,
    ) -> Result<EpisodeOutcome, SimError> {
        let timings = self.timings();
        let mut controllers = Vec::with_capacity(self.control.intersections.len());
        for signal_id in &self.control.intersections {
            controllers.push(PhaseController::new(sim, signal_id.clone(), timings).await?);
        }

        let detector = PriorityDetector::new(self.control.intersections.clone());
        let discretizer = Discretizer::new(
            self.control.profile,
            self.control.halt_speed,
            self.control.intersections.clone(),
        );
        let collector = MetricsCollector::new(
            self.control.intersections.clone(),
            self.control.halt_speed,
        );
        let reward_params = FlowRewardParams {
            starvation_threshold: self.learn.starvation_threshold,
        };

        let mut steps: u64 = 0;
        let mut total_reward = 0.0;

        while sim.vehicles_expected().await? && steps < self.learn.max_steps {
            let priorities = detector.detect_all(sim).await?;

            for controller in &mut controllers {
                let signal_id = controller.signal_id().to_string();
                let state = discretizer.observe(sim, &signal_id).await?;
                let key = QKey::new(&signal_id, state);

                // Preemption bypasses selection, never the update.
                let preempt = priorities
                    .get(&signal_id)
                    .and_then(|signal| signal.preempt());
                let action = match preempt {
                    Some(direction) => {
                        tracing::debug!(
                            "Preempting {} towards {}",
                            signal_id,
                            direction.as_str()
                        );
                        direction
                    }
                    None => self.policy.select(&mut self.rng, table, &key, epsilon),
                };

                steps += controller.apply(sim, action).await?;

                let next_state = discretizer.observe(sim, &signal_id).await?;
                let reward = match self.control.profile {
                    Profile::Local => queue_reward(&next_state),
                    Profile::Global => flow_reward(sim, &next_state, reward_params).await?,
                };
                total_reward += reward;

                let next_key = QKey::new(&signal_id, next_state);
                self.policy.update(table, &key, action, reward, &next_key);
            }

            let metrics = collector.sample(sim, steps).await?;
            self.observer.on_cycle(&metrics);

            if steps < self.learn.max_steps {
                sim.advance().await?;
                steps += 1;
            }
        }

        Ok(EpisodeOutcome {
            steps,
            total_reward,
        })
    }
}
