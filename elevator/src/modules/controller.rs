/// ----- CONTROLLER MODULE -----
/// The network facing half of a car. Applies scheduler commands to the
/// car's request queue and answers its queries.

use std::net::SocketAddr;
use std::sync::MutexGuard;

use log::{debug, info, warn};

use shared_resources::link::{Link, LinkError};
use shared_resources::logger::car_target;
use shared_resources::system_message::SystemMessage;

use crate::utilities::request_queue::{self, RequestQueue, SharedQueue};

pub struct Controller {
    elevator_id: u8,
    target: String,
    link: Link,
    queue: SharedQueue,
}

impl Controller {
    /// Registers the link's endpoint with the scheduler as this car's
    /// controller.
    pub fn register(elevator_id: u8, link: Link, scheduler: SocketAddr, queue: SharedQueue) -> Result<Self, LinkError> {
        link.send(&SystemMessage::RegisterController { elevator_id }, scheduler)?;
        let target = car_target(elevator_id);
        info!(target: target.as_str(), "Controller {} registered from {}", elevator_id, link.local_addr());
        Ok(Controller {
            elevator_id,
            target,
            link,
            queue,
        })
    }

    /// Only returns on a transport or codec error.
    pub fn run(&mut self) -> Result<(), LinkError> {
        loop {
            let message = self.link.recv()?;
            self.handle(message)?;
        }
    }

    fn handle(&mut self, message: SystemMessage) -> Result<(), LinkError> {
        debug!(target: self.target.as_str(), "Controller {} received {}", self.elevator_id, message);
        match message {
            SystemMessage::AddNewRequest { request } => {
                info!(target: self.target.as_str(), "Elevator {} received request {}", self.elevator_id, request);
                self.queue().enqueue(request);
                Ok(())
            }
            SystemMessage::NewPrimaryRequest { .. } => {
                let next = self.queue().next_primary_request();
                self.link.reply_primary(next.as_ref())
            }
            SystemMessage::IsStopRequired { floor, direction, .. } => {
                let required = self.queue().stop_required_at(floor, direction);
                self.link.reply_stop_required(required)
            }
            SystemMessage::ServiceArrivals { floor, direction, .. } => {
                self.queue().service_arrivals(floor, direction);
                Ok(())
            }
            SystemMessage::CompleteArrivals { floor, direction, .. } => {
                self.queue().complete_arrivals(floor, direction);
                Ok(())
            }
            SystemMessage::StatusRequest { .. } => {
                let status = self.queue().status();
                self.link.reply_status(&status)
            }
            other => {
                warn!(target: self.target.as_str(), "Controller {} ignoring {}", self.elevator_id, other.kind());
                Ok(())
            }
        }
    }

    fn queue(&self) -> MutexGuard<'_, RequestQueue> {
        request_queue::lock(&self.queue)
    }
}
