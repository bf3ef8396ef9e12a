pub mod config;
pub mod control;
pub mod infra;
pub mod learning;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types for convenience
pub use infra::{Direction, SimConnection, SimControl, SimError, TrafficSim, VehicleClass, VehicleInfo};
pub use learning::{QTable, Trainer};

// Re-export proto interface
pub mod sim_interface {
    include!(concat!(env!("OUT_DIR"), "/greenwave.interface.rs"));
}
