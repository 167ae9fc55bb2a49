use std::fmt;
use std::time::Duration;

use super::direction::Direction;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    PickedUp,
}

/// Fault injected into a request to exercise fault handling. Only evaluated
/// once the request's passenger is on board.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultType {
    #[default]
    NoFault,
    /// Transient: the door is slow to open at the destination.
    DoorFault,
    /// Hard: the car overruns its floor timer and shuts down.
    FloorTimerFault,
}

impl FaultType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "NO_FAULT" | "NONE" => Some(FaultType::NoFault),
            "DOOR_FAULT" => Some(FaultType::DoorFault),
            "FLOOR_TIMER_FAULT" => Some(FaultType::FloorTimerFault),
            _ => None,
        }
    }
}

/// One passenger's journey: a hall call at `floor` followed by a car call to
/// `car_button`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Request {
    /// Offset from scenario start at which the passenger pressed the button.
    pub time: Duration,
    pub floor: u8,
    pub floor_button: Direction,
    pub car_button: u8,
    pub fault: FaultType,
    status: RequestStatus,
}

impl Request {
    pub fn new(time: Duration, floor: u8, floor_button: Direction, car_button: u8) -> Self {
        Request {
            time,
            floor,
            floor_button,
            car_button,
            fault: FaultType::NoFault,
            status: RequestStatus::Pending,
        }
    }

    pub fn with_fault(mut self, fault: FaultType) -> Self {
        self.fault = fault;
        self
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn is_picked_up(&self) -> bool {
        self.status == RequestStatus::PickedUp
    }

    /// Marks the passenger as boarded. There is no way back to `Pending`.
    pub fn pick_up(&mut self) {
        self.status = RequestStatus::PickedUp;
    }

    /// Travel direction of the journey, `None` when origin and destination
    /// are the same floor.
    pub fn direction(&self) -> Option<Direction> {
        match Direction::towards(self.floor, self.car_button) {
            Direction::Stop => None,
            direction => Some(direction),
        }
    }

    /// Where the car has to go next for this request: the origin while the
    /// passenger waits, the destination once on board.
    pub fn current_target_floor(&self) -> u8 {
        match self.status {
            RequestStatus::Pending => self.floor,
            RequestStatus::PickedUp => self.car_button,
        }
    }

    pub fn has_fault(&self, fault: FaultType) -> bool {
        fault != FaultType::NoFault && self.fault == fault
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|Floor: {}, Direction: {}, CarButton: {}|",
            self.floor, self.floor_button, self.car_button
        )
    }
}
