//! gRPC connection to the remote simulation engine.

use std::error::Error;
use std::fmt;

use tonic::transport::Channel;

use crate::sim_interface::sim_service_client::SimServiceClient;
use crate::sim_interface::{
    ControlledLanesRequest, ExpectedVehiclesRequest, GetVehicleRequest,
    LaneHaltingCountRequest, LaneVehiclesRequest, ListVehiclesRequest, SetSignalStateRequest,
    StartRequest, StartResult, StepRequest, StopRequest,
};

use super::client::{SimControl, TrafficSim, VehicleInfo};
use super::types::VehicleClass;

#[derive(Debug)]
pub enum SimError {
    StartFailed { result: StartResult },
    Transport(tonic::transport::Error),
    Rpc(tonic::Status),
}

impl fmt::Display for SimError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::StartFailed { result } => {
                write!(formatter, "Start failed (result {})", result.as_str_name())
            }
            SimError::Transport(err) => write!(formatter, "Transport error: {}", err),
            SimError::Rpc(status) => write!(formatter, "Rpc error: {}", status),
        }
    }
}

impl Error for SimError {}

impl From<tonic::transport::Error> for SimError {
    fn from(err: tonic::transport::Error) -> Self {
        SimError::Transport(err)
    }
}

impl From<tonic::Status> for SimError {
    fn from(status: tonic::Status) -> Self {
        SimError::Rpc(status)
    }
}

/// Long-lived connection to the simulation service. Sessions opened
/// from it are strictly sequential; a session borrows the connection
/// exclusively until it is closed.
pub struct SimConnection {
    client: SimServiceClient<Channel>,
}

impl SimConnection {
    pub async fn connect(host: &str) -> Result<Self, SimError> {
        let client = SimServiceClient::connect(format!("http://{}", host)).await?;
        Ok(SimConnection { client })
    }

    /// Loads a scenario and opens one simulation session. Fails when
    /// the scenario is missing or malformed; that aborts the episode
    /// run with the reported cause.
    pub async fn open(
        &mut self,
        scenario: &str,
        step_length: f64,
    ) -> Result<SimSession<'_>, SimError> {
        let request = StartRequest {
            scenario: scenario.to_string(),
            step_length,
        };
        let response = self.client.start(request).await?.into_inner();
        let result = StartResult::try_from(response.result).unwrap_or(StartResult::Unknown);

        if result != StartResult::Ok {
            return Err(SimError::StartFailed { result });
        }

        Ok(SimSession {
            client: &mut self.client,
            session_id: response.session_id.unwrap_or_default(),
        })
    }
}

impl SimControl for SimConnection {
    type Session<'s> = SimSession<'s>;

    async fn open(
        &mut self,
        scenario: &str,
        step_length: f64,
    ) -> Result<SimSession<'_>, SimError> {
        SimConnection::open(self, scenario, step_length).await
    }

    async fn close(session: Self::Session<'_>) -> Result<(), SimError> {
        session.close().await
    }
}

/// One open scenario session. Implements the [`TrafficSim`] capability
/// surface consumed by the control loop.
pub struct SimSession<'c> {
    client: &'c mut SimServiceClient<Channel>,
    session_id: String,
}

impl SimSession<'_> {
    pub async fn close(self) -> Result<(), SimError> {
        self.client
            .stop(StopRequest {
                session_id: self.session_id,
            })
            .await?;
        Ok(())
    }
}

impl TrafficSim for SimSession<'_> {
    async fn vehicles_expected(&mut self) -> Result<bool, SimError> {
        let response = self
            .client
            .expected_vehicles(ExpectedVehiclesRequest {
                session_id: self.session_id.clone(),
            })
            .await?
            .into_inner();
        Ok(response.count > 0)
    }

    async fn advance(&mut self) -> Result<(), SimError> {
        self.client
            .step(StepRequest {
                session_id: self.session_id.clone(),
            })
            .await?;
        Ok(())
    }

    async fn vehicle_ids(&mut self) -> Result<Vec<String>, SimError> {
        let response = self
            .client
            .list_vehicles(ListVehiclesRequest {
                session_id: self.session_id.clone(),
            })
            .await?
            .into_inner();
        Ok(response.ids)
    }

    async fn vehicle(&mut self, vehicle_id: &str) -> Result<Option<VehicleInfo>, SimError> {
        let response = self
            .client
            .get_vehicle(GetVehicleRequest {
                session_id: self.session_id.clone(),
                vehicle_id: vehicle_id.to_string(),
            })
            .await?
            .into_inner();

        if !response.found {
            return Ok(None);
        }

        Ok(Some(VehicleInfo {
            class: VehicleClass::from_wire(&response.vehicle_class),
            speed: response.speed,
            angle: response.angle,
            waiting_time: response.waiting_time,
        }))
    }

    async fn controlled_lanes(&mut self, signal_id: &str) -> Result<Vec<String>, SimError> {
        let response = self
            .client
            .controlled_lanes(ControlledLanesRequest {
                session_id: self.session_id.clone(),
                signal_id: signal_id.to_string(),
            })
            .await?
            .into_inner();
        Ok(response.ids)
    }

    async fn lane_vehicles(&mut self, lane_id: &str) -> Result<Vec<String>, SimError> {
        let response = self
            .client
            .lane_vehicles(LaneVehiclesRequest {
                session_id: self.session_id.clone(),
                lane_id: lane_id.to_string(),
            })
            .await?
            .into_inner();
        Ok(response.ids)
    }

    async fn lane_halting_count(&mut self, lane_id: &str) -> Result<u32, SimError> {
        let response = self
            .client
            .lane_halting_count(LaneHaltingCountRequest {
                session_id: self.session_id.clone(),
                lane_id: lane_id.to_string(),
            })
            .await?
            .into_inner();
        Ok(response.count)
    }

    async fn set_signal_state(&mut self, signal_id: &str, state: &str) -> Result<(), SimError> {
        self.client
            .set_signal_state(SetSignalStateRequest {
                session_id: self.session_id.clone(),
                signal_id: signal_id.to_string(),
                state: state.to_string(),
            })
            .await?;
        Ok(())
    }
}
