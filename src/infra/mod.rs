mod client;
mod observer;
pub mod sim;
mod types;

pub use client::{SimControl, TrafficSim, VehicleInfo};
pub use observer::{CompositeObserver, DefaultObserver, EpisodeObserver, MetricsObserver};
pub use sim::{SimConnection, SimError, SimSession};
pub use types::{Direction, VehicleClass};
