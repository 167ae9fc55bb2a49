/// ----- DISPATCHER MODULE -----
/// Single sequential loop owning the car registry. Traffic from floors and
/// car state machines arrives on the request link; commands to controllers
/// go out, and their replies come back, on the control link. A reply from a
/// controller is relayed verbatim to whoever sent the query.

use std::collections::VecDeque;
use std::net::SocketAddr;

use log::{debug, info, warn};

use shared_resources::elevator_status::ElevatorStatus;
use shared_resources::link::{Link, LinkError};
use shared_resources::request::Request;
use shared_resources::system_message::SystemMessage;

use crate::utilities::elevator_assigner::select_best_elevator;
use crate::utilities::registry::Registry;

pub struct Dispatcher {
    requests: Link,
    control: Link,
    floor_addr: SocketAddr,
    registry: Registry,
    backlog: VecDeque<Request>,
}

impl Dispatcher {
    pub fn new(requests: Link, control: Link, floor_addr: SocketAddr) -> Self {
        Dispatcher {
            requests,
            control,
            floor_addr,
            registry: Registry::new(),
            backlog: VecDeque::new(),
        }
    }

    pub fn request_addr(&self) -> SocketAddr {
        self.requests.local_addr()
    }

    #[cfg(test)]
    pub(crate) fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Only returns on a transport or codec error.
    pub fn run(&mut self) -> Result<(), LinkError> {
        loop {
            self.step()?;
        }
    }

    /// Receives and handles exactly one message.
    pub fn step(&mut self) -> Result<(), LinkError> {
        let message = self.requests.recv()?;
        debug!("received {}", message);
        self.handle(message)
    }

    fn handle(&mut self, message: SystemMessage) -> Result<(), LinkError> {
        match message {
            SystemMessage::RegisterController { elevator_id } => {
                let Some(addr) = self.requests.last_sender() else {
                    return Ok(());
                };
                info!("Registered elevator {} at {}", elevator_id, addr);
                self.registry.register(elevator_id, addr);
                self.flush_backlog()
            }
            SystemMessage::AddNewRequest { request } => self.dispatch(request),
            SystemMessage::ShutdownReport { elevator_id, requests } => {
                warn!(
                    "Elevator {} shut down, reassigning {} request(s)",
                    elevator_id,
                    requests.len()
                );
                self.registry.retire(elevator_id);
                for request in requests {
                    self.dispatch(request)?;
                }
                Ok(())
            }
            SystemMessage::SetFloorLamp { .. } | SystemMessage::SetFloorDirectionLamp { .. } => {
                self.control.send(&message, self.floor_addr)
            }
            query_or_notice => match query_or_notice.elevator_id() {
                Some(elevator_id) if query_or_notice.expects_reply() => self.relay(elevator_id, &query_or_notice),
                Some(elevator_id) => {
                    self.forward(elevator_id, &query_or_notice)?;
                    Ok(())
                }
                None => Ok(()),
            },
        }
    }

    /// Sends `message` to the car's controller. `false` if the car is unknown.
    fn forward(&self, elevator_id: u8, message: &SystemMessage) -> Result<bool, LinkError> {
        match self.registry.addr(elevator_id) {
            Some(addr) => {
                self.control.send(message, addr)?;
                Ok(true)
            }
            None => {
                warn!("Dropping {}: elevator {} is not registered", message.kind(), elevator_id);
                Ok(false)
            }
        }
    }

    /// Forwards a query and passes the controller's answer back to the
    /// original sender.
    fn relay(&mut self, elevator_id: u8, message: &SystemMessage) -> Result<(), LinkError> {
        if self.forward(elevator_id, message)? {
            let answer = self.control.recv_raw()?;
            return self.requests.reply_raw(&answer);
        }
        match message {
            SystemMessage::NewPrimaryRequest { .. } => self.requests.reply_primary(None),
            SystemMessage::IsStopRequired { .. } => self.requests.reply_stop_required(false),
            _ => Ok(()),
        }
    }

    fn poll_statuses(&mut self) -> Result<Vec<ElevatorStatus>, LinkError> {
        let mut statuses = Vec::new();
        for (elevator_id, addr) in self.registry.in_service() {
            let status = self.control.request_status(elevator_id, addr)?;
            debug!(
                "Elevator {} at floor {} going {}, stops up {:?} down {:?}",
                status.elevator_id, status.floor, status.direction, status.stop_floors_up, status.stop_floors_down
            );
            statuses.push(status);
        }
        Ok(statuses)
    }

    fn dispatch(&mut self, request: Request) -> Result<(), LinkError> {
        if request.direction().is_none() {
            warn!("Ignoring request {}: origin and destination are the same floor", request);
            return Ok(());
        }
        let statuses = self.poll_statuses()?;
        match select_best_elevator(&statuses, &request) {
            Some(elevator_id) => {
                info!("Assigned request {} to elevator {}", request, elevator_id);
                self.forward(elevator_id, &SystemMessage::AddNewRequest { request })?;
            }
            None => {
                info!("No elevator in service, holding request {}", request);
                self.backlog.push_back(request);
            }
        }
        Ok(())
    }

    fn flush_backlog(&mut self) -> Result<(), LinkError> {
        let waiting: Vec<Request> = self.backlog.drain(..).collect();
        for request in waiting {
            self.dispatch(request)?;
        }
        Ok(())
    }
}
