//! In-process fake simulator for exercising the control loop without a
//! live scenario.

use std::collections::HashMap;

use crate::infra::{SimControl, SimError, TrafficSim, VehicleClass, VehicleInfo};

#[derive(Debug, Clone)]
pub struct FakeVehicle {
    pub class: VehicleClass,
    pub speed: f64,
    pub angle: f64,
    pub waiting_time: f64,
}

/// Scripted [`TrafficSim`] implementation. Lanes may reference vehicle
/// ids without a backing vehicle to model departures mid-scan.
pub struct FakeSim {
    vehicles: HashMap<String, FakeVehicle>,
    lane_occupants: HashMap<String, Vec<String>>,
    controlled: HashMap<String, Vec<String>>,
    /// Liveness horizon: vehicles are expected while fewer advances
    /// than this have happened.
    pub horizon: u64,
    pub advances: u64,
    /// Advances past this count fail with an rpc error.
    pub fail_after_advances: Option<u64>,
    /// Times a session over this sim was closed.
    pub closes: u32,
    pub signal_log: Vec<(String, String)>,
}

impl FakeSim {
    pub fn new() -> Self {
        Self {
            vehicles: HashMap::new(),
            lane_occupants: HashMap::new(),
            controlled: HashMap::new(),
            horizon: u64::MAX,
            advances: 0,
            fail_after_advances: None,
            closes: 0,
            signal_log: Vec::new(),
        }
    }

    pub fn add_signal(&mut self, signal_id: &str, lanes: &[&str]) {
        self.controlled.insert(
            signal_id.to_string(),
            lanes.iter().map(|lane| lane.to_string()).collect(),
        );
        for lane in lanes {
            self.lane_occupants.entry(lane.to_string()).or_default();
        }
    }

    pub fn add_vehicle(
        &mut self,
        vehicle_id: &str,
        class: &str,
        speed: f64,
        angle: f64,
        waiting_time: f64,
        lane: Option<&str>,
    ) {
        self.vehicles.insert(
            vehicle_id.to_string(),
            FakeVehicle {
                class: VehicleClass::from_wire(class),
                speed,
                angle,
                waiting_time,
            },
        );
        if let Some(lane) = lane {
            self.lane_occupants
                .entry(lane.to_string())
                .or_default()
                .push(vehicle_id.to_string());
        }
    }

    /// Lists an id on a lane without a backing vehicle, as if it
    /// departed between enumeration and lookup.
    pub fn list_departed_vehicle(&mut self, vehicle_id: &str, lane: &str) {
        self.lane_occupants
            .entry(lane.to_string())
            .or_default()
            .push(vehicle_id.to_string());
    }

    /// Green signal strings emitted so far for one intersection.
    pub fn greens_for(&self, signal_id: &str) -> Vec<String> {
        self.signal_log
            .iter()
            .filter(|(id, state)| id == signal_id && state.contains('G'))
            .map(|(_, state)| state.clone())
            .collect()
    }
}

impl Default for FakeSim {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficSim for FakeSim {
    async fn vehicles_expected(&mut self) -> Result<bool, SimError> {
        Ok(self.advances < self.horizon)
    }

    async fn advance(&mut self) -> Result<(), SimError> {
        if let Some(limit) = self.fail_after_advances
            && self.advances >= limit
        {
            return Err(SimError::Rpc(tonic::Status::internal("step failed")));
        }
        self.advances += 1;
        Ok(())
    }

    async fn vehicle_ids(&mut self) -> Result<Vec<String>, SimError> {
        let mut ids: Vec<String> = self.vehicles.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn vehicle(&mut self, vehicle_id: &str) -> Result<Option<VehicleInfo>, SimError> {
        Ok(self.vehicles.get(vehicle_id).map(|v| VehicleInfo {
            class: v.class,
            speed: v.speed,
            angle: v.angle,
            waiting_time: v.waiting_time,
        }))
    }

    async fn controlled_lanes(&mut self, signal_id: &str) -> Result<Vec<String>, SimError> {
        Ok(self.controlled.get(signal_id).cloned().unwrap_or_default())
    }

    async fn lane_vehicles(&mut self, lane_id: &str) -> Result<Vec<String>, SimError> {
        Ok(self
            .lane_occupants
            .get(lane_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn lane_halting_count(&mut self, lane_id: &str) -> Result<u32, SimError> {
        let Some(occupants) = self.lane_occupants.get(lane_id) else {
            return Ok(0);
        };
        Ok(occupants
            .iter()
            .filter_map(|id| self.vehicles.get(id))
            .filter(|v| v.speed < 0.1)
            .count() as u32)
    }

    async fn set_signal_state(&mut self, signal_id: &str, state: &str) -> Result<(), SimError> {
        self.signal_log
            .push((signal_id.to_string(), state.to_string()));
        Ok(())
    }
}

impl TrafficSim for &mut FakeSim {
    async fn vehicles_expected(&mut self) -> Result<bool, SimError> {
        (**self).vehicles_expected().await
    }

    async fn advance(&mut self) -> Result<(), SimError> {
        (**self).advance().await
    }

    async fn vehicle_ids(&mut self) -> Result<Vec<String>, SimError> {
        (**self).vehicle_ids().await
    }

    async fn vehicle(&mut self, vehicle_id: &str) -> Result<Option<VehicleInfo>, SimError> {
        (**self).vehicle(vehicle_id).await
    }

    async fn controlled_lanes(&mut self, signal_id: &str) -> Result<Vec<String>, SimError> {
        (**self).controlled_lanes(signal_id).await
    }

    async fn lane_vehicles(&mut self, lane_id: &str) -> Result<Vec<String>, SimError> {
        (**self).lane_vehicles(lane_id).await
    }

    async fn lane_halting_count(&mut self, lane_id: &str) -> Result<u32, SimError> {
        (**self).lane_halting_count(lane_id).await
    }

    async fn set_signal_state(&mut self, signal_id: &str, state: &str) -> Result<(), SimError> {
        (**self).set_signal_state(signal_id, state).await
    }
}

/// Session source over one [`FakeSim`], for exercising the training
/// loop's session lifecycle.
pub struct FakeConnection {
    pub sim: FakeSim,
}

impl FakeConnection {
    pub fn new(sim: FakeSim) -> Self {
        Self { sim }
    }
}

impl SimControl for FakeConnection {
    type Session<'s> = &'s mut FakeSim;

    async fn open(
        &mut self,
        _scenario: &str,
        _step_length: f64,
    ) -> Result<&mut FakeSim, SimError> {
        Ok(&mut self.sim)
    }

    async fn close(session: Self::Session<'_>) -> Result<(), SimError> {
        session.closes += 1;
        Ok(())
    }
}
