//! Fixed-time baseline controller, the comparison point for the
//! learned policy. No sensing, no learning: phases rotate on a fixed
//! schedule while the same metrics rows are recorded.

use crate::config::ControlConfig;
use crate::infra::{Direction, EpisodeObserver, SimError, TrafficSim};

use super::metrics::MetricsCollector;
use super::phase::{SignalPhase, signal_string};

pub struct FixedTimeRunner {
    control: ControlConfig,
    max_steps: u64,
    observer: Box<dyn EpisodeObserver>,
}

impl FixedTimeRunner {
    pub fn new(
        control: ControlConfig,
        max_steps: u64,
        observer: impl EpisodeObserver + 'static,
    ) -> Self {
        Self {
            control,
            max_steps,
            observer: Box::new(observer),
        }
    }

    fn cycle_length(&self) -> u64 {
        2 * (self.control.green_duration as u64 + self.control.yellow_duration as u64)
    }

    /// Phase shown at a point in simulated time, identical for every
    /// intersection.
    fn phase_at(&self, time: u64) -> SignalPhase {
        let green = self.control.green_duration as u64;
        let yellow = self.control.yellow_duration as u64;
        let t = time % self.cycle_length();

        if t < green {
            SignalPhase::Green(Direction::Vertical)
        } else if t < green + yellow {
            SignalPhase::Yellow(Direction::Vertical)
        } else if t < green + yellow + green {
            SignalPhase::Green(Direction::Horizontal)
        } else {
            SignalPhase::Yellow(Direction::Horizontal)
        }
    }

    pub async fn run<S: TrafficSim>(&mut self, sim: &mut S) -> Result<u64, SimError> {
        let mut signals = Vec::with_capacity(self.control.intersections.len());
        for signal_id in &self.control.intersections {
            let lane_axes: Vec<Option<Direction>> = sim
                .controlled_lanes(signal_id)
                .await?
                .iter()
                .map(|lane| Direction::from_lane_name(lane))
                .collect();
            signals.push((signal_id.clone(), lane_axes));
        }

        let collector = MetricsCollector::new(
            self.control.intersections.clone(),
            self.control.halt_speed,
        );

        self.observer.on_episode_start(0, 0.0);
        let mut time: u64 = 0;

        while sim.vehicles_expected().await? && time < self.max_steps {
            let phase = self.phase_at(time);
            for (signal_id, lane_axes) in &signals {
                sim.set_signal_state(signal_id, &signal_string(lane_axes, phase))
                    .await?;
            }

            let metrics = collector.sample(sim, time).await?;
            self.observer.on_cycle(&metrics);

            sim.advance().await?;
            time += 1;
        }

        self.observer.on_episode_end(0, time, 0.0, 0.0);
        self.observer.on_finished(1);
        tracing::info!("Fixed-time run finished after {} steps", time);
        Ok(time)
    }
}
