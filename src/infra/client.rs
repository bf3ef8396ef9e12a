//! Capability surface of the simulation engine.
//!
//! Everything the control and learning code needs from the simulator
//! goes through this trait, so the whole engine can be exercised
//! against an in-process fake instead of a live scenario.

use super::sim::SimError;
use super::types::VehicleClass;

/// Snapshot of a single vehicle.
#[derive(Debug, Clone, Copy)]
pub struct VehicleInfo {
    pub class: VehicleClass,
    pub speed: f64,
    pub angle: f64,
    pub waiting_time: f64,
}

/// Injected simulator client. One implementor wraps a live remote
/// session; tests provide their own.
///
/// Vehicle lookups return `Ok(None)` for an identifier that departed or
/// teleported between enumeration and query; callers skip such vehicles
/// and continue their scan.
#[allow(async_fn_in_trait)]
pub trait TrafficSim {
    /// Liveness: are vehicles still present or expected in the network?
    async fn vehicles_expected(&mut self) -> Result<bool, SimError>;

    /// Advance simulated time by exactly one step.
    async fn advance(&mut self) -> Result<(), SimError>;

    /// All vehicles currently in the network.
    async fn vehicle_ids(&mut self) -> Result<Vec<String>, SimError>;

    async fn vehicle(&mut self, vehicle_id: &str) -> Result<Option<VehicleInfo>, SimError>;

    /// Lanes controlled by an intersection's signal.
    async fn controlled_lanes(&mut self, signal_id: &str) -> Result<Vec<String>, SimError>;

    /// Vehicles currently occupying a lane.
    async fn lane_vehicles(&mut self, lane_id: &str) -> Result<Vec<String>, SimError>;

    /// Halted-vehicle count on a lane as maintained by the simulator.
    async fn lane_halting_count(&mut self, lane_id: &str) -> Result<u32, SimError>;

    /// Set the full per-lane signal string for an intersection.
    async fn set_signal_state(&mut self, signal_id: &str, state: &str) -> Result<(), SimError>;
}

/// Source of strictly sequential simulation sessions. The engine holds
/// one scenario at a time; every opened session must be closed before
/// the next one, including on failure paths.
#[allow(async_fn_in_trait)]
pub trait SimControl {
    type Session<'s>: TrafficSim
    where
        Self: 's;

    async fn open(
        &mut self,
        scenario: &str,
        step_length: f64,
    ) -> Result<Self::Session<'_>, SimError>;

    async fn close(session: Self::Session<'_>) -> Result<(), SimError>;
}
