//! State discretization: continuous sensor readings to small tuples.

use crate::config::Profile;
use crate::infra::{Direction, SimError, TrafficSim};

/// Queue-length bucket: groups of five vehicles, capped at 5.
pub fn queue_bucket(count: u32) -> u8 {
    (count / 5).min(5) as u8
}

/// Average-speed bucket: 2-unit intervals, capped at 5.
pub fn speed_bucket(speed: f64) -> u8 {
    ((speed as u32) / 2).min(5) as u8
}

/// Network-wide halted bucket: groups of ten, capped at 10.
pub fn network_queue_bucket(count: u32) -> u8 {
    (count / 10).min(10) as u8
}

/// Network-wide observations added by the `Global` profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GlobalObservation {
    pub avg_speed: u8,
    pub halted: u8,
    /// Any privileged vehicle anywhere in the network.
    pub priority: bool,
}

/// Discrete state key of one intersection. The shape is fixed per
/// profile: `global` is always `None` under `Local` and always `Some`
/// under `Global`, so all keys of one table encode to the same length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrafficState {
    pub halted_horizontal: u8,
    pub halted_vertical: u8,
    pub global: Option<GlobalObservation>,
}

impl TrafficState {
    /// Flat encoding used by the persisted table format.
    pub fn encode(&self) -> Vec<u32> {
        match self.global {
            None => vec![self.halted_horizontal as u32, self.halted_vertical as u32],
            Some(g) => vec![
                self.halted_horizontal as u32,
                self.halted_vertical as u32,
                g.avg_speed as u32,
                g.halted as u32,
                g.priority as u32,
            ],
        }
    }

    pub fn decode(values: &[u32]) -> Option<Self> {
        match values {
            [h, v] => Some(Self {
                halted_horizontal: *h as u8,
                halted_vertical: *v as u8,
                global: None,
            }),
            [h, v, speed, halted, priority] => Some(Self {
                halted_horizontal: *h as u8,
                halted_vertical: *v as u8,
                global: Some(GlobalObservation {
                    avg_speed: *speed as u8,
                    halted: *halted as u8,
                    priority: *priority != 0,
                }),
            }),
            _ => None,
        }
    }
}

/// Builds discrete state keys from live simulator readings.
pub struct Discretizer {
    profile: Profile,
    halt_speed: f64,
    intersections: Vec<String>,
}

impl Discretizer {
    pub fn new(profile: Profile, halt_speed: f64, intersections: Vec<String>) -> Self {
        Self {
            profile,
            halt_speed,
            intersections,
        }
    }

    /// Observes one intersection and, under the `Global` profile, the
    /// rest of the network.
    pub async fn observe<S: TrafficSim>(
        &self,
        sim: &mut S,
        signal_id: &str,
    ) -> Result<TrafficState, SimError> {
        let (horizontal, vertical) = self.axis_halted(sim, signal_id).await?;

        let global = match self.profile {
            Profile::Local => None,
            Profile::Global => Some(self.observe_network(sim).await?),
        };

        Ok(TrafficState {
            halted_horizontal: queue_bucket(horizontal),
            halted_vertical: queue_bucket(vertical),
            global,
        })
    }

    /// Counts halted vehicles per axis on the intersection's controlled
    /// lanes. Vehicles that depart mid-scan are skipped.
    async fn axis_halted<S: TrafficSim>(
        &self,
        sim: &mut S,
        signal_id: &str,
    ) -> Result<(u32, u32), SimError> {
        let mut horizontal = 0u32;
        let mut vertical = 0u32;

        for lane in sim.controlled_lanes(signal_id).await? {
            let Some(axis) = Direction::from_lane_name(&lane) else {
                continue;
            };
            for vehicle_id in sim.lane_vehicles(&lane).await? {
                let Some(info) = sim.vehicle(&vehicle_id).await? else {
                    continue;
                };
                if info.speed < self.halt_speed {
                    match axis {
                        Direction::Horizontal => horizontal += 1,
                        Direction::Vertical => vertical += 1,
                    }
                }
            }
        }

        Ok((horizontal, vertical))
    }

    async fn observe_network<S: TrafficSim>(
        &self,
        sim: &mut S,
    ) -> Result<GlobalObservation, SimError> {
        let mut moving = 0u32;
        let mut speed_sum = 0.0;
        let mut priority = false;

        for vehicle_id in sim.vehicle_ids().await? {
            let Some(info) = sim.vehicle(&vehicle_id).await? else {
                continue;
            };
            if info.speed > 0.0 {
                moving += 1;
                speed_sum += info.speed;
            }
            if info.class.is_privileged() {
                priority = true;
            }
        }

        let avg_speed = if moving > 0 {
            speed_sum / moving as f64
        } else {
            0.0
        };

        let mut halted = 0u32;
        for signal_id in &self.intersections {
            for lane in sim.controlled_lanes(signal_id).await? {
                halted += sim.lane_halting_count(&lane).await?;
            }
        }

        Ok(GlobalObservation {
            avg_speed: speed_bucket(avg_speed),
            halted: network_queue_bucket(halted),
            priority,
        })
    }
}
