/// Axis of travel granted green at an intersection. The action space of
/// the policy is exactly these two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Horizontal,
    Vertical,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Horizontal => Direction::Vertical,
            Direction::Vertical => Direction::Horizontal,
        }
    }

    /// Classifies a vehicle heading (degrees, 0 = north, clockwise)
    /// into the axis it is travelling along.
    pub fn from_heading(angle: f64) -> Self {
        if (angle > 45.0 && angle < 135.0) || (angle > 225.0 && angle < 315.0) {
            Direction::Vertical
        } else {
            Direction::Horizontal
        }
    }

    /// Derives a lane's axis from the compass tokens in its name, the
    /// convention the scenario network uses for approach lanes.
    pub fn from_lane_name(lane: &str) -> Option<Self> {
        if lane.contains('N') || lane.contains('S') {
            Some(Direction::Vertical)
        } else if lane.contains('E') || lane.contains('W') {
            Some(Direction::Horizontal)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Horizontal => "horizontal",
            Direction::Vertical => "vertical",
        }
    }
}

/// Vehicle category as reported by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleClass {
    Emergency,
    Authority,
    Regular,
}

impl VehicleClass {
    pub fn from_wire(class: &str) -> Self {
        match class {
            "emergency" => VehicleClass::Emergency,
            "authority" => VehicleClass::Authority,
            _ => VehicleClass::Regular,
        }
    }

    /// Preemption level: emergency outranks authority outranks none.
    pub fn priority_level(self) -> u8 {
        match self {
            VehicleClass::Emergency => 2,
            VehicleClass::Authority => 1,
            VehicleClass::Regular => 0,
        }
    }

    pub fn is_privileged(self) -> bool {
        self.priority_level() > 0
    }
}
