use std::collections::BTreeSet;

use super::direction::Direction;

/// Fresh snapshot of one car, produced on demand for the dispatcher.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ElevatorStatus {
    pub elevator_id: u8,
    pub direction: Direction,
    pub floor: u8,
    pub stop_floors_up: BTreeSet<u8>,
    pub stop_floors_down: BTreeSet<u8>,
    pub in_service: bool,
}

impl ElevatorStatus {
    pub fn new(elevator_id: u8, floor: u8) -> Self {
        ElevatorStatus {
            elevator_id,
            direction: Direction::Stop,
            floor,
            stop_floors_up: BTreeSet::new(),
            stop_floors_down: BTreeSet::new(),
            in_service: true,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.direction == Direction::Stop
    }

    pub fn stop_floors_in_direction(&self, direction: Direction) -> Option<&BTreeSet<u8>> {
        match direction {
            Direction::Up => Some(&self.stop_floors_up),
            Direction::Down => Some(&self.stop_floors_down),
            Direction::Stop => None,
        }
    }

    pub fn has_stop_at(&self, floor: u8, direction: Direction) -> bool {
        self.stop_floors_in_direction(direction)
            .map_or(false, |floors| floors.contains(&floor))
    }
}
