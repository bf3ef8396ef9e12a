//! Reward functions, computed from the state after a phase is applied.

use crate::control::{GlobalObservation, TrafficState};
use crate::infra::{SimError, TrafficSim};

/// Queue reward: negative sum of the resulting state's halted buckets.
pub fn queue_reward(state: &TrafficState) -> f64 {
    -((state.halted_horizontal + state.halted_vertical) as f64)
}

/// Weights of the network-flow reward. The starvation penalty is
/// deliberately extreme; a vehicle waiting past the threshold means the
/// policy has parked an approach.
#[derive(Debug, Clone, Copy)]
pub struct FlowRewardParams {
    pub starvation_threshold: f64,
}

impl Default for FlowRewardParams {
    fn default() -> Self {
        Self {
            starvation_threshold: 250.0,
        }
    }
}

/// Flow reward: scores network-wide fluidity and punishes waiting
/// privileged vehicles. Uses the discretized global observation of the
/// post-transition state plus raw waiting-time scans.
pub async fn flow_reward<S: TrafficSim>(
    sim: &mut S,
    state: &TrafficState,
    params: FlowRewardParams,
) -> Result<f64, SimError> {
    let global = state.global.unwrap_or_default();

    let mut vehicles = 0u32;
    let mut waiting_sum = 0.0;
    let mut moving = 0u32;
    let mut speed_sum = 0.0;
    let mut privileged_waiting = 0.0;
    let mut starved = 0u32;

    for vehicle_id in sim.vehicle_ids().await? {
        let Some(info) = sim.vehicle(&vehicle_id).await? else {
            continue;
        };
        vehicles += 1;
        waiting_sum += info.waiting_time;
        if info.speed > 0.0 {
            moving += 1;
            speed_sum += info.speed;
        }
        if info.class.is_privileged() {
            privileged_waiting += info.waiting_time;
        }
        if info.waiting_time > params.starvation_threshold {
            starved += 1;
        }
    }

    let mean_waiting = if vehicles > 0 {
        waiting_sum / vehicles as f64
    } else {
        0.0
    };
    let avg_speed = if moving > 0 {
        speed_sum / moving as f64
    } else {
        0.0
    };

    let mut reward = -10.0 * global.halted as f64;
    reward -= 5.0 * mean_waiting;
    reward += 20.0 * avg_speed;
    if global.priority {
        reward -= 50.0;
    }
    reward -= 100.0 * privileged_waiting;
    reward -= 1000.0 * starved as f64;

    Ok(reward)
}
