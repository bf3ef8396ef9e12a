use std::io;

use tracing::info;

use crate::control::{CycleMetrics, MetricsWriter};

/// Trait for observing episode events during training and replay.
pub trait EpisodeObserver {
    /// Called when an episode's session has been opened.
    fn on_episode_start(&mut self, episode: u32, epsilon: f64);

    /// Called once per control cycle with the sampled metrics.
    fn on_cycle(&mut self, metrics: &CycleMetrics);

    /// Called after the episode's session is closed.
    fn on_episode_end(&mut self, episode: u32, steps: u64, total_reward: f64, best_reward: f64);

    /// Called once after the last episode.
    fn on_finished(&mut self, episodes_run: u32);
}

pub struct DefaultObserver;

impl EpisodeObserver for DefaultObserver {
    fn on_episode_start(&mut self, episode: u32, epsilon: f64) {
        info!("Episode {} started (epsilon {:.3})", episode + 1, epsilon);
    }

    fn on_cycle(&mut self, metrics: &CycleMetrics) {
        let all = metrics.all();
        tracing::debug!(
            "step {}: {} vehicles, {} halted, mean wait {:.1}",
            metrics.step,
            all.vehicles,
            all.halted,
            all.mean_waiting(),
        );
    }

    fn on_episode_end(&mut self, episode: u32, steps: u64, total_reward: f64, best_reward: f64) {
        info!(
            "Episode {} finished: steps {}, total reward {:.2}, best {:.2}",
            episode + 1,
            steps,
            total_reward,
            best_reward,
        );
    }

    fn on_finished(&mut self, episodes_run: u32) {
        info!("Run finished after {} episodes", episodes_run);
    }
}

/// Appends every cycle's metrics to a CSV run file for the external
/// report generator. Write failures are logged, not fatal; losing a
/// metrics row must never abort a training run.
pub struct MetricsObserver {
    writer: MetricsWriter,
    episode: u32,
}

impl MetricsObserver {
    pub fn new(writer: MetricsWriter) -> Self {
        Self { writer, episode: 0 }
    }

    pub fn create(dir: &str, label: &str) -> io::Result<Self> {
        Ok(Self {
            writer: MetricsWriter::create(dir, label)?,
            episode: 0,
        })
    }
}

impl EpisodeObserver for MetricsObserver {
    fn on_episode_start(&mut self, episode: u32, _epsilon: f64) {
        self.episode = episode;
    }

    fn on_cycle(&mut self, metrics: &CycleMetrics) {
        if let Err(err) = self.writer.append(self.episode, metrics) {
            tracing::warn!("Failed to append metrics row: {}", err);
        }
    }

    fn on_episode_end(&mut self, _episode: u32, _steps: u64, _total: f64, _best: f64) {}

    fn on_finished(&mut self, _episodes_run: u32) {
        info!("Metrics written to {}", self.writer.path().display());
    }
}

impl EpisodeObserver for Box<dyn EpisodeObserver> {
    fn on_episode_start(&mut self, episode: u32, epsilon: f64) {
        (**self).on_episode_start(episode, epsilon);
    }

    fn on_cycle(&mut self, metrics: &CycleMetrics) {
        (**self).on_cycle(metrics);
    }

    fn on_episode_end(&mut self, episode: u32, steps: u64, total_reward: f64, best_reward: f64) {
        (**self).on_episode_end(episode, steps, total_reward, best_reward);
    }

    fn on_finished(&mut self, episodes_run: u32) {
        (**self).on_finished(episodes_run);
    }
}

pub struct CompositeObserver {
    observers: Vec<Box<dyn EpisodeObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Box<dyn EpisodeObserver>>) -> Self {
        Self { observers }
    }
}

impl EpisodeObserver for CompositeObserver {
    fn on_episode_start(&mut self, episode: u32, epsilon: f64) {
        for observer in &mut self.observers {
            observer.on_episode_start(episode, epsilon);
        }
    }

    fn on_cycle(&mut self, metrics: &CycleMetrics) {
        for observer in &mut self.observers {
            observer.on_cycle(metrics);
        }
    }

    fn on_episode_end(&mut self, episode: u32, steps: u64, total_reward: f64, best_reward: f64) {
        for observer in &mut self.observers {
            observer.on_episode_end(episode, steps, total_reward, best_reward);
        }
    }

    fn on_finished(&mut self, episodes_run: u32) {
        for observer in &mut self.observers {
            observer.on_finished(episodes_run);
        }
    }
}
