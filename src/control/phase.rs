//! Per-intersection signal phase state machine.
//!
//! Planning is pure: given the current and requested direction, a
//! [`PhaseController`] produces the ordered list of phases and hold
//! durations. Applying a plan is the only effectful part; it mutates
//! the signal and advances simulated time one explicit step at a time.

use crate::infra::{Direction, SimError, TrafficSim};

/// One state of the signal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPhase {
    Green(Direction),
    Yellow(Direction),
    AllRed,
}

impl SignalPhase {
    /// Symbol emitted for a lane of the given axis under this phase.
    /// Lanes with an unknown axis are held red.
    fn lane_symbol(&self, lane_axis: Option<Direction>) -> char {
        match (self, lane_axis) {
            (SignalPhase::Green(d), Some(axis)) if *d == axis => 'G',
            (SignalPhase::Yellow(d), Some(axis)) if *d == axis => 'y',
            _ => 'r',
        }
    }
}

/// Builds the full per-lane signal string for a phase.
pub fn signal_string(lane_axes: &[Option<Direction>], phase: SignalPhase) -> String {
    lane_axes
        .iter()
        .map(|axis| phase.lane_symbol(*axis))
        .collect()
}

/// Fixed hold durations, in simulated time units.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimings {
    pub green: u32,
    pub yellow: u32,
    /// 0 disables the all-red clearance phase.
    pub all_red: u32,
}

/// An ordered sequence of phases with hold durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    pub phases: Vec<(SignalPhase, u32)>,
}

impl PhasePlan {
    pub fn total_duration(&self) -> u64 {
        self.phases.iter().map(|(_, duration)| *duration as u64).sum()
    }

    pub fn has_yellow(&self) -> bool {
        self.phases
            .iter()
            .any(|(phase, _)| matches!(phase, SignalPhase::Yellow(_)))
    }
}

/// State machine for one intersection. Owns the remembered active
/// direction; nothing else mutates it.
pub struct PhaseController {
    signal_id: String,
    lane_axes: Vec<Option<Direction>>,
    timings: PhaseTimings,
    current: Option<Direction>,
}

impl PhaseController {
    /// Queries the intersection's controlled lanes once and caches
    /// their axis classification for signal-string construction.
    pub async fn new<S: TrafficSim>(
        sim: &mut S,
        signal_id: String,
        timings: PhaseTimings,
    ) -> Result<Self, SimError> {
        let lanes = sim.controlled_lanes(&signal_id).await?;
        let lane_axes = lanes
            .iter()
            .map(|lane| Direction::from_lane_name(lane))
            .collect();

        Ok(Self {
            signal_id,
            lane_axes,
            timings,
            current: None,
        })
    }

    pub fn signal_id(&self) -> &str {
        &self.signal_id
    }

    pub fn current(&self) -> Option<Direction> {
        self.current
    }

    /// Overrides the remembered direction, used when taking over an
    /// intersection whose signal is already in a known phase.
    pub fn assume_current(&mut self, direction: Direction) {
        self.current = Some(direction);
    }

    /// Pure transition plan towards `target`. A yellow clearance for
    /// the old direction is inserted exactly when the direction
    /// actually changes; a same-direction request re-greens without
    /// any clearance.
    pub fn plan(&self, target: Direction) -> PhasePlan {
        let mut phases = Vec::new();

        if self.timings.all_red > 0 {
            phases.push((SignalPhase::AllRed, self.timings.all_red));
        }
        if let Some(current) = self.current
            && current != target
        {
            phases.push((SignalPhase::Yellow(current), self.timings.yellow));
        }
        phases.push((SignalPhase::Green(target), self.timings.green));

        PhasePlan { phases }
    }

    /// Applies a full transition: emits each phase's signal string and
    /// holds it by advancing the simulation one step per time unit.
    /// Returns the elapsed units for the episode step counter.
    pub async fn apply<S: TrafficSim>(
        &mut self,
        sim: &mut S,
        target: Direction,
    ) -> Result<u64, SimError> {
        let plan = self.plan(target);

        for (phase, duration) in &plan.phases {
            let state = signal_string(&self.lane_axes, *phase);
            sim.set_signal_state(&self.signal_id, &state).await?;
            for _ in 0..*duration {
                sim.advance().await?;
            }
        }

        self.current = Some(target);
        Ok(plan.total_duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSim;

    const TIMINGS: PhaseTimings = PhaseTimings {
        green: 15,
        yellow: 2,
        all_red: 0,
    };

    async fn controller(sim: &mut FakeSim) -> PhaseController {
        sim.add_signal("B2", &["NB2_0", "EB2_0", "SB2_0", "WB2_0"]);
        PhaseController::new(sim, "B2".to_string(), TIMINGS)
            .await
            .unwrap()
    }

    #[test]
    fn signal_strings_per_phase() {
        let axes = vec![
            Some(Direction::Vertical),
            Some(Direction::Horizontal),
            None,
        ];
        assert_eq!(signal_string(&axes, SignalPhase::Green(Direction::Vertical)), "Grr");
        assert_eq!(signal_string(&axes, SignalPhase::Yellow(Direction::Vertical)), "yrr");
        assert_eq!(signal_string(&axes, SignalPhase::Green(Direction::Horizontal)), "rGr");
        assert_eq!(signal_string(&axes, SignalPhase::AllRed), "rrr");
    }

    #[tokio::test]
    async fn direction_change_inserts_yellow() {
        let mut sim = FakeSim::new();
        let mut ctrl = controller(&mut sim).await;
        ctrl.assume_current(Direction::Horizontal);

        let plan = ctrl.plan(Direction::Vertical);
        assert_eq!(
            plan.phases,
            vec![
                (SignalPhase::Yellow(Direction::Horizontal), 2),
                (SignalPhase::Green(Direction::Vertical), 15),
            ]
        );
        assert_eq!(plan.total_duration(), 17);
    }

    #[tokio::test]
    async fn same_direction_skips_yellow() {
        let mut sim = FakeSim::new();
        let mut ctrl = controller(&mut sim).await;
        ctrl.assume_current(Direction::Vertical);

        let plan = ctrl.plan(Direction::Vertical);
        assert!(!plan.has_yellow());
        assert_eq!(plan.total_duration(), 15);
    }

    #[tokio::test]
    async fn initial_grant_has_no_yellow() {
        let mut sim = FakeSim::new();
        let ctrl = controller(&mut sim).await;
        assert_eq!(ctrl.current(), None);
        assert!(!ctrl.plan(Direction::Horizontal).has_yellow());
    }

    #[tokio::test]
    async fn all_red_clearance_leads_the_plan() {
        let mut sim = FakeSim::new();
        sim.add_signal("B2", &["NB2_0", "EB2_0"]);
        let mut ctrl = PhaseController::new(
            &mut sim,
            "B2".to_string(),
            PhaseTimings {
                green: 30,
                yellow: 3,
                all_red: 3,
            },
        )
        .await
        .unwrap();
        ctrl.assume_current(Direction::Vertical);

        let plan = ctrl.plan(Direction::Horizontal);
        assert_eq!(plan.phases[0], (SignalPhase::AllRed, 3));
        assert_eq!(plan.total_duration(), 36);
    }

    #[tokio::test]
    async fn apply_emits_signals_and_advances_time() {
        let mut sim = FakeSim::new();
        let mut ctrl = controller(&mut sim).await;
        ctrl.assume_current(Direction::Horizontal);

        let elapsed = ctrl.apply(&mut sim, Direction::Vertical).await.unwrap();

        assert_eq!(elapsed, 17);
        assert_eq!(sim.advances, 17);
        assert_eq!(
            sim.signal_log,
            vec![
                ("B2".to_string(), "ryry".to_string()),
                ("B2".to_string(), "GrGr".to_string()),
            ]
        );
        assert_eq!(ctrl.current(), Some(Direction::Vertical));
    }
}
