//! Per-cycle control building blocks: sensing, discretization and the
//! signal phase state machine.

pub mod discretize;
pub mod fixed;
pub mod metrics;
pub mod phase;
pub mod priority;

pub use discretize::{Discretizer, GlobalObservation, TrafficState};
pub use fixed::FixedTimeRunner;
pub use metrics::{CycleMetrics, GroupMetrics, MetricsCollector, MetricsWriter, MovingAverage};
pub use phase::{PhaseController, PhasePlan, PhaseTimings, SignalPhase, signal_string};
pub use priority::{PriorityDetector, PrioritySignal};
