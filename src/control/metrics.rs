//! Per-cycle traffic metrics for the external reporting pipeline.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use time::{OffsetDateTime, format_description};

use crate::infra::{SimError, TrafficSim, VehicleClass};

/// Moving average over a fixed window, used for training logs.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f64>,
    window_size: usize,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.window_size {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        }
    }
}

/// Aggregates for one group of vehicles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupMetrics {
    pub vehicles: u32,
    pub halted: u32,
    pub waiting_sum: f64,
    pub speed_sum: f64,
}

impl GroupMetrics {
    fn record(&mut self, speed: f64, waiting: f64, halted: bool) {
        self.vehicles += 1;
        if halted {
            self.halted += 1;
        }
        self.waiting_sum += waiting;
        self.speed_sum += speed;
    }

    fn merged(self, other: GroupMetrics) -> GroupMetrics {
        GroupMetrics {
            vehicles: self.vehicles + other.vehicles,
            halted: self.halted + other.halted,
            waiting_sum: self.waiting_sum + other.waiting_sum,
            speed_sum: self.speed_sum + other.speed_sum,
        }
    }

    pub fn mean_waiting(&self) -> f64 {
        if self.vehicles > 0 {
            self.waiting_sum / self.vehicles as f64
        } else {
            0.0
        }
    }

    pub fn mean_speed(&self) -> f64 {
        if self.vehicles > 0 {
            self.speed_sum / self.vehicles as f64
        } else {
            0.0
        }
    }
}

/// One control cycle's metrics record, grouped by vehicle class.
#[derive(Debug, Clone, Default)]
pub struct CycleMetrics {
    pub step: u64,
    pub lane_count: u32,
    pub regular: GroupMetrics,
    pub authority: GroupMetrics,
    pub emergency: GroupMetrics,
}

impl CycleMetrics {
    pub fn privileged(&self) -> GroupMetrics {
        self.authority.merged(self.emergency)
    }

    pub fn all(&self) -> GroupMetrics {
        self.regular.merged(self.privileged())
    }

    /// Vehicles per controlled lane.
    pub fn density(&self) -> f64 {
        if self.lane_count > 0 {
            self.all().vehicles as f64 / self.lane_count as f64
        } else {
            0.0
        }
    }
}

/// Samples network state once per control cycle.
pub struct MetricsCollector {
    intersections: Vec<String>,
    halt_speed: f64,
}

impl MetricsCollector {
    pub fn new(intersections: Vec<String>, halt_speed: f64) -> Self {
        Self {
            intersections,
            halt_speed,
        }
    }

    pub async fn sample<S: TrafficSim>(
        &self,
        sim: &mut S,
        step: u64,
    ) -> Result<CycleMetrics, SimError> {
        let mut metrics = CycleMetrics {
            step,
            ..CycleMetrics::default()
        };

        for signal_id in &self.intersections {
            metrics.lane_count += sim.controlled_lanes(signal_id).await?.len() as u32;
        }

        for vehicle_id in sim.vehicle_ids().await? {
            let Some(info) = sim.vehicle(&vehicle_id).await? else {
                continue;
            };
            let halted = info.speed < self.halt_speed;
            let group = match info.class {
                VehicleClass::Regular => &mut metrics.regular,
                VehicleClass::Authority => &mut metrics.authority,
                VehicleClass::Emergency => &mut metrics.emergency,
            };
            group.record(info.speed, info.waiting_time, halted);
        }

        Ok(metrics)
    }
}

/// Appends cycle metrics as CSV rows, one row per vehicle group, for
/// the downstream report generator.
pub struct MetricsWriter {
    path: PathBuf,
}

impl MetricsWriter {
    /// Creates a timestamped run file under `dir`.
    pub fn create(dir: &str, label: &str) -> io::Result<Self> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(
                &format_description::parse("[year][month][day]-[hour][minute][second]").unwrap(),
            )
            .unwrap_or_else(|_| "run".to_string());

        let path = Path::new(dir).join(format!("{}-{}.csv", label, stamp));
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one cycle's rows. The episode index disambiguates rows
    /// across episodes, whose step counters all restart at zero.
    pub fn append(&mut self, episode: u32, metrics: &CycleMetrics) -> io::Result<()> {
        let file_exists = self.path.exists();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if !file_exists {
            writeln!(
                file,
                "episode,step,group,vehicles,halted,mean_waiting,mean_speed,density"
            )?;
        }

        let groups = [
            ("all", metrics.all()),
            ("regular", metrics.regular),
            ("authority", metrics.authority),
            ("emergency", metrics.emergency),
            ("privileged", metrics.privileged()),
        ];
        for (name, group) in groups {
            writeln!(
                file,
                "{},{},{},{},{},{:.3},{:.3},{:.3}",
                episode,
                metrics.step,
                name,
                group.vehicles,
                group.halted,
                group.mean_waiting(),
                group.mean_speed(),
                metrics.density(),
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSim;

    #[test]
    fn moving_average_window() {
        let mut avg = MovingAverage::new(3);

        avg.push(1.0);
        assert!((avg.average() - 1.0).abs() < 1e-9);

        avg.push(2.0);
        avg.push(3.0);
        assert!((avg.average() - 2.0).abs() < 1e-9);

        avg.push(4.0); // pushes out 1.0
        assert!((avg.average() - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn samples_by_class() {
        let mut sim = FakeSim::new();
        sim.add_signal("B2", &["NB2_0", "EB2_0"]);
        sim.add_vehicle("car1", "passenger", 0.0, 0.0, 12.0, Some("NB2_0"));
        sim.add_vehicle("car2", "passenger", 7.0, 90.0, 0.0, None);
        sim.add_vehicle("amb", "emergency", 0.05, 90.0, 30.0, Some("EB2_0"));

        let collector = MetricsCollector::new(vec!["B2".to_string()], 0.1);
        let metrics = collector.sample(&mut sim, 42).await.unwrap();

        assert_eq!(metrics.step, 42);
        assert_eq!(metrics.lane_count, 2);
        assert_eq!(metrics.regular.vehicles, 2);
        assert_eq!(metrics.regular.halted, 1);
        assert_eq!(metrics.emergency.vehicles, 1);
        assert_eq!(metrics.emergency.halted, 1);
        assert_eq!(metrics.privileged().vehicles, 1);
        assert_eq!(metrics.all().vehicles, 3);
        assert!((metrics.density() - 1.5).abs() < 1e-9);
        assert!((metrics.emergency.mean_waiting() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn writer_emits_header_once() {
        let dir = std::env::temp_dir().join("greenwave-metrics-test");
        let dir = dir.to_string_lossy().to_string();
        let mut writer = MetricsWriter::create(&dir, "unit").unwrap();
        // Unique per run thanks to the timestamp, but clean up anyway.
        let path = writer.path().to_path_buf();
        let _ = std::fs::remove_file(&path);

        let metrics = CycleMetrics {
            step: 1,
            lane_count: 2,
            ..CycleMetrics::default()
        };
        writer.append(0, &metrics).unwrap();
        writer.append(0, &metrics).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let headers = contents
            .lines()
            .filter(|line| line.starts_with("episode,"))
            .count();
        assert_eq!(headers, 1);
        // Two cycles, five groups each, one header.
        assert_eq!(contents.lines().count(), 11);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rows_carry_the_episode_index() {
        let dir = std::env::temp_dir().join("greenwave-metrics-episode-test");
        let dir = dir.to_string_lossy().to_string();
        let mut writer = MetricsWriter::create(&dir, "episodes").unwrap();
        let path = writer.path().to_path_buf();
        let _ = std::fs::remove_file(&path);

        let metrics = CycleMetrics {
            step: 1,
            lane_count: 2,
            ..CycleMetrics::default()
        };
        // Same step counter in two different episodes must stay
        // distinguishable in the export.
        writer.append(0, &metrics).unwrap();
        writer.append(3, &metrics).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().any(|line| line.starts_with("0,1,all,")));
        assert!(contents.lines().any(|line| line.starts_with("3,1,all,")));
        std::fs::remove_file(&path).unwrap();
    }
}
