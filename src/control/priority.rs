//! Detection of privileged vehicles approaching controlled lanes.

use std::collections::HashMap;

use crate::infra::{Direction, SimError, TrafficSim};

/// Directional urgency signal for one intersection: the axis with the
/// strictly higher privileged level, or no direction on a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySignal {
    pub direction: Option<Direction>,
    pub level: u8,
}

impl PrioritySignal {
    pub fn none() -> Self {
        Self {
            direction: None,
            level: 0,
        }
    }

    /// Direction the intersection must be forced to, when any.
    pub fn preempt(&self) -> Option<Direction> {
        if self.level > 0 { self.direction } else { None }
    }
}

/// Resolves the per-axis maxima into a single signal. Equal levels,
/// including both zero, cancel out.
pub fn resolve(horizontal: u8, vertical: u8) -> PrioritySignal {
    if horizontal > vertical {
        PrioritySignal {
            direction: Some(Direction::Horizontal),
            level: horizontal,
        }
    } else if vertical > horizontal {
        PrioritySignal {
            direction: Some(Direction::Vertical),
            level: vertical,
        }
    } else {
        PrioritySignal::none()
    }
}

/// Scans controlled lanes for emergency and authority vehicles.
pub struct PriorityDetector {
    intersections: Vec<String>,
}

impl PriorityDetector {
    pub fn new(intersections: Vec<String>) -> Self {
        Self { intersections }
    }

    /// One signal per intersection, all computed from the same scan
    /// instant so the cycle's decisions share a consistent view.
    pub async fn detect_all<S: TrafficSim>(
        &self,
        sim: &mut S,
    ) -> Result<HashMap<String, PrioritySignal>, SimError> {
        let mut signals = HashMap::new();
        for signal_id in &self.intersections {
            let signal = self.detect(sim, signal_id).await?;
            signals.insert(signal_id.clone(), signal);
        }
        Ok(signals)
    }

    pub async fn detect<S: TrafficSim>(
        &self,
        sim: &mut S,
        signal_id: &str,
    ) -> Result<PrioritySignal, SimError> {
        let mut horizontal = 0u8;
        let mut vertical = 0u8;

        for lane in sim.controlled_lanes(signal_id).await? {
            for vehicle_id in sim.lane_vehicles(&lane).await? {
                // Departed between enumeration and lookup: skip, never abort.
                let Some(info) = sim.vehicle(&vehicle_id).await? else {
                    continue;
                };
                let level = info.class.priority_level();
                if level == 0 {
                    continue;
                }
                match Direction::from_heading(info.angle) {
                    Direction::Horizontal => horizontal = horizontal.max(level),
                    Direction::Vertical => vertical = vertical.max(level),
                }
            }
        }

        Ok(resolve(horizontal, vertical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSim;

    #[test]
    fn resolution_prefers_strictly_higher_level() {
        assert_eq!(resolve(0, 0), PrioritySignal::none());
        assert_eq!(resolve(2, 2), PrioritySignal::none());
        assert_eq!(
            resolve(2, 1),
            PrioritySignal {
                direction: Some(Direction::Horizontal),
                level: 2
            }
        );
        assert_eq!(
            resolve(0, 1),
            PrioritySignal {
                direction: Some(Direction::Vertical),
                level: 1
            }
        );
    }

    #[test]
    fn preempt_requires_nonzero_level() {
        assert_eq!(PrioritySignal::none().preempt(), None);
        assert_eq!(
            resolve(0, 2).preempt(),
            Some(Direction::Vertical)
        );
    }

    #[tokio::test]
    async fn detects_emergency_over_authority() {
        let mut sim = FakeSim::new();
        sim.add_signal("B2", &["NB2_0", "EB2_0"]);
        // Authority heading east, emergency heading south.
        sim.add_vehicle("auth", "authority", 5.0, 90.0, 0.0, Some("EB2_0"));
        sim.add_vehicle("amb", "emergency", 5.0, 180.0, 0.0, Some("NB2_0"));

        let detector = PriorityDetector::new(vec!["B2".to_string()]);
        let signal = detector.detect(&mut sim, "B2").await.unwrap();

        // Heading 90 is vertical axis, heading 180 horizontal.
        assert_eq!(signal.level, 2);
        assert_eq!(signal.direction, Some(Direction::Horizontal));
    }

    #[tokio::test]
    async fn tie_yields_no_direction() {
        let mut sim = FakeSim::new();
        sim.add_signal("B2", &["NB2_0", "EB2_0"]);
        sim.add_vehicle("amb1", "emergency", 5.0, 90.0, 0.0, Some("EB2_0"));
        sim.add_vehicle("amb2", "emergency", 5.0, 180.0, 0.0, Some("NB2_0"));

        let detector = PriorityDetector::new(vec!["B2".to_string()]);
        let signal = detector.detect(&mut sim, "B2").await.unwrap();
        assert_eq!(signal, PrioritySignal::none());
    }

    #[tokio::test]
    async fn vanished_vehicle_does_not_abort_scan() {
        let mut sim = FakeSim::new();
        sim.add_signal("B2", &["NB2_0"]);
        sim.list_departed_vehicle("ghost", "NB2_0");
        sim.add_vehicle("amb", "emergency", 5.0, 90.0, 0.0, Some("NB2_0"));

        let detector = PriorityDetector::new(vec!["B2".to_string()]);
        let signal = detector.detect(&mut sim, "B2").await.unwrap();
        assert_eq!(signal.level, 2);
        assert_eq!(signal.direction, Some(Direction::Vertical));
    }
}
