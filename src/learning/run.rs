//! Greedy inference: drives a scenario with the trained table.

use std::io;
use std::path::Path;

use crate::config::{ControlConfig, Profile};
use crate::control::{Discretizer, MetricsCollector, PhaseController, PhaseTimings, PriorityDetector};
use crate::infra::{Direction, EpisodeObserver, SimError, TrafficSim};

use super::policy::QLearning;
use super::qtable::{QKey, QTable};

/// Replays the learned policy greedily, with priority preemption and
/// an alternating-direction fallback for states the table never saw.
pub struct GreedyRunner {
    control: ControlConfig,
    max_steps: u64,
    table: QTable,
    observer: Box<dyn EpisodeObserver>,
}

impl GreedyRunner {
    pub fn new(
        control: ControlConfig,
        max_steps: u64,
        table: QTable,
        observer: impl EpisodeObserver + 'static,
    ) -> Self {
        Self {
            control,
            max_steps,
            table,
            observer: Box::new(observer),
        }
    }

    /// Loads the persisted table for the active profile. A missing
    /// file is recoverable: the runner falls back to the alternating
    /// default policy instead of failing. A present but malformed file
    /// is still an error, and so is a table persisted under the other
    /// profile, whose entries would all be unreachable.
    pub fn load_table(path: &Path, profile: Profile) -> io::Result<QTable> {
        match QTable::load(path, profile.as_str()) {
            Ok(table) => Ok(table),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(
                    "No table at {}; using the alternating default policy",
                    path.display()
                );
                Ok(QTable::new())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn run<S: TrafficSim>(&mut self, sim: &mut S) -> Result<u64, SimError> {
        let timings = PhaseTimings {
            green: self.control.green_duration,
            yellow: self.control.yellow_duration,
            all_red: self.control.all_red_duration,
        };
        let mut controllers = Vec::with_capacity(self.control.intersections.len());
        for signal_id in &self.control.intersections {
            let mut controller =
                PhaseController::new(sim, signal_id.clone(), timings).await?;
            // The scenario opens with vertical green everywhere.
            controller.assume_current(Direction::Vertical);
            controllers.push(controller);
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

        self.observer.on_episode_start(0, 0.0);
        let mut steps: u64 = 0;

        while sim.vehicles_expected().await? && steps < self.max_steps {
            let priorities = detector.detect_all(sim).await?;

            for controller in &mut controllers {
                let signal_id = controller.signal_id().to_string();
                let preempt = priorities
                    .get(&signal_id)
                    .and_then(|signal| signal.preempt());

                let action = match preempt {
                    Some(direction) => {
                        tracing::info!(
                            "Priority preemption at {} towards {} (step {})",
                            signal_id,
                            direction.as_str(),
                            steps
                        );
                        direction
                    }
                    None => {
                        let state = discretizer.observe(sim, &signal_id).await?;
                        let key = QKey::new(&signal_id, state);
                        QLearning::greedy(&self.table, &key).unwrap_or_else(|| {
                            controller
                                .current()
                                .map(Direction::opposite)
                                .unwrap_or(Direction::Horizontal)
                        })
                    }
                };

                steps += controller.apply(sim, action).await?;
            }

            let metrics = collector.sample(sim, steps).await?;
            self.observer.on_cycle(&metrics);
        }

        self.observer.on_episode_end(0, steps, 0.0, 0.0);
        self.observer.on_finished(1);
        tracing::info!("Replay finished after {} steps", steps);
        Ok(steps)
    }
}
