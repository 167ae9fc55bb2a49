use std::fmt;

use super::direction::Direction;
use super::elevator_status::ElevatorStatus;
use super::request::Request;

/// Every datagram exchanged between the dispatcher, the cars and the floor
/// side. Each kind carries only the fields it needs.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub enum SystemMessage {
    /// Binds `elevator_id` to the endpoint the message was sent from.
    RegisterController { elevator_id: u8 },
    /// Reply: `Option<Request>`.
    NewPrimaryRequest { elevator_id: u8 },
    AddNewRequest { request: Request },
    /// Reply: one byte, 1 or 0.
    IsStopRequired { elevator_id: u8, floor: u8, direction: Direction },
    ServiceArrivals { elevator_id: u8, floor: u8, direction: Direction },
    CompleteArrivals { elevator_id: u8, floor: u8, direction: Direction },
    SetFloorLamp { elevator_id: u8, floor: u8, direction: Direction, state: bool },
    SetFloorDirectionLamp { elevator_id: u8, floor: u8, direction: Direction, state: bool },
    /// Reply: `ElevatorStatus`.
    StatusRequest { elevator_id: u8 },
    ShutdownReport { elevator_id: u8, requests: Vec<Request> },
}

impl SystemMessage {
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// The car the message is about, if any.
    pub fn elevator_id(&self) -> Option<u8> {
        match *self {
            SystemMessage::AddNewRequest { .. } => None,
            SystemMessage::RegisterController { elevator_id }
            | SystemMessage::NewPrimaryRequest { elevator_id }
            | SystemMessage::IsStopRequired { elevator_id, .. }
            | SystemMessage::ServiceArrivals { elevator_id, .. }
            | SystemMessage::CompleteArrivals { elevator_id, .. }
            | SystemMessage::SetFloorLamp { elevator_id, .. }
            | SystemMessage::SetFloorDirectionLamp { elevator_id, .. }
            | SystemMessage::StatusRequest { elevator_id }
            | SystemMessage::ShutdownReport { elevator_id, .. } => Some(elevator_id),
        }
    }

    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            SystemMessage::NewPrimaryRequest { .. }
                | SystemMessage::IsStopRequired { .. }
                | SystemMessage::StatusRequest { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SystemMessage::RegisterController { .. } => "REGISTER_CONTROLLER",
            SystemMessage::NewPrimaryRequest { .. } => "NEW_PRIMARY_REQUEST",
            SystemMessage::AddNewRequest { .. } => "ADD_NEW_REQUEST",
            SystemMessage::IsStopRequired { .. } => "IS_STOP_REQUIRED",
            SystemMessage::ServiceArrivals { .. } => "SERVICE_ARRIVALS_AT_FLOOR",
            SystemMessage::CompleteArrivals { .. } => "COMPLETE_ARRIVALS_AT_FLOOR",
            SystemMessage::SetFloorLamp { .. } => "SET_FLOOR_LAMP",
            SystemMessage::SetFloorDirectionLamp { .. } => "SET_FLOOR_DIRECTION_LAMP",
            SystemMessage::StatusRequest { .. } => "STATUS_REQUEST",
            SystemMessage::ShutdownReport { .. } => "SHUTDOWN_REPORT",
        }
    }
}

impl fmt::Display for SystemMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemMessage::AddNewRequest { request } => write!(f, "{} {}", self.kind(), request),
            SystemMessage::IsStopRequired { elevator_id, floor, direction }
            | SystemMessage::ServiceArrivals { elevator_id, floor, direction }
            | SystemMessage::CompleteArrivals { elevator_id, floor, direction } => {
                write!(f, "{} car {} floor {} {}", self.kind(), elevator_id, floor, direction)
            }
            SystemMessage::SetFloorLamp { elevator_id, floor, direction, state }
            | SystemMessage::SetFloorDirectionLamp { elevator_id, floor, direction, state } => write!(
                f,
                "{} car {} floor {} {} {}",
                self.kind(),
                elevator_id,
                floor,
                direction,
                if *state { "on" } else { "off" }
            ),
            SystemMessage::ShutdownReport { elevator_id, requests } => write!(
                f,
                "{} car {} returning {} request(s)",
                self.kind(),
                elevator_id,
                requests.len()
            ),
            SystemMessage::RegisterController { elevator_id }
            | SystemMessage::NewPrimaryRequest { elevator_id }
            | SystemMessage::StatusRequest { elevator_id } => {
                write!(f, "{} car {}", self.kind(), elevator_id)
            }
        }
    }
}

/// Reply payload codecs. A reply is matched to its request by position only,
/// so each side must know which shape to expect.
pub mod reply {
    use super::{ElevatorStatus, Request};

    pub fn encode_primary(request: Option<&Request>) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(&request)
    }

    pub fn decode_primary(bytes: &[u8]) -> Result<Option<Request>, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn encode_stop_required(required: bool) -> Vec<u8> {
        vec![required as u8]
    }

    /// `None` for an empty payload.
    pub fn decode_stop_required(bytes: &[u8]) -> Option<bool> {
        bytes.first().map(|b| *b == 1)
    }

    pub fn encode_status(status: &ElevatorStatus) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(status)
    }

    pub fn decode_status(bytes: &[u8]) -> Result<ElevatorStatus, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::request::FaultType;

    #[test]
    fn shutdown_report_survives_the_wire() {
        let mut boarded = Request::new(Duration::from_millis(1500), 2, Direction::Up, 9)
            .with_fault(FaultType::FloorTimerFault);
        boarded.pick_up();
        let message = SystemMessage::ShutdownReport {
            elevator_id: 3,
            requests: vec![boarded, Request::new(Duration::ZERO, 8, Direction::Down, 1)],
        };

        let decoded = SystemMessage::decode(&message.encode().unwrap()).unwrap();
        assert_eq!(decoded, message);
        if let SystemMessage::ShutdownReport { requests, .. } = decoded {
            assert!(requests[0].is_picked_up());
            assert!(!requests[1].is_picked_up());
        }
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(SystemMessage::decode(&[0xff, 0xff, 0xff, 0xff, 0x01]).is_err());
    }

    #[test]
    fn only_queries_expect_replies() {
        assert!(SystemMessage::NewPrimaryRequest { elevator_id: 0 }.expects_reply());
        assert!(SystemMessage::StatusRequest { elevator_id: 0 }.expects_reply());
        assert!(SystemMessage::IsStopRequired { elevator_id: 0, floor: 2, direction: Direction::Up }
            .expects_reply());
        assert!(!SystemMessage::ServiceArrivals { elevator_id: 0, floor: 2, direction: Direction::Up }
            .expects_reply());
        assert!(!SystemMessage::RegisterController { elevator_id: 0 }.expects_reply());
    }

    #[test]
    fn new_requests_are_not_addressed_to_a_car() {
        let add = SystemMessage::AddNewRequest {
            request: Request::new(Duration::ZERO, 1, Direction::Up, 4),
        };
        assert_eq!(add.elevator_id(), None);
        assert_eq!(SystemMessage::StatusRequest { elevator_id: 4 }.elevator_id(), Some(4));
    }

    #[test]
    fn empty_primary_reply_is_explicit() {
        let bytes = reply::encode_primary(None).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(reply::decode_primary(&bytes).unwrap(), None);
    }

    #[test]
    fn stop_reply_is_a_single_byte() {
        assert_eq!(reply::encode_stop_required(true), vec![1]);
        assert_eq!(reply::decode_stop_required(&[0]), Some(false));
        assert_eq!(reply::decode_stop_required(&[]), None);
    }
}
