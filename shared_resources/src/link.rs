use std::net::SocketAddr;

use log::trace;
use network_rust::udpnet::{Endpoint, NetError};

use super::direction::Direction;
use super::elevator_status::ElevatorStatus;
use super::request::Request;
use super::system_message::{reply, SystemMessage};

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error(transparent)]
    Net(#[from] NetError),

    #[error("malformed payload: {0}")]
    Codec(#[from] bincode::Error),

    #[error("empty reply to {0}")]
    EmptyReply(&'static str),
}

/// Typed messaging over one endpoint. Calls that expect an answer send and
/// then block on the next inbound datagram, which is taken to be the reply.
pub struct Link {
    endpoint: Box<dyn Endpoint>,
}

impl Link {
    pub fn new(endpoint: impl Endpoint + 'static) -> Self {
        Link {
            endpoint: Box::new(endpoint),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn last_sender(&self) -> Option<SocketAddr> {
        self.endpoint.last_sender()
    }

    pub fn send(&self, message: &SystemMessage, dest: SocketAddr) -> Result<(), LinkError> {
        trace!("{} -> {}: {}", self.local_addr(), dest, message);
        self.endpoint.send_to(&message.encode()?, dest)?;
        Ok(())
    }

    pub fn recv(&mut self) -> Result<SystemMessage, LinkError> {
        let bytes = self.endpoint.recv()?;
        Ok(SystemMessage::decode(&bytes)?)
    }

    pub fn recv_raw(&mut self) -> Result<Vec<u8>, LinkError> {
        Ok(self.endpoint.recv()?)
    }

    /// Answers whoever sent the most recent datagram.
    pub fn reply_raw(&self, payload: &[u8]) -> Result<(), LinkError> {
        self.endpoint.reply(payload)?;
        Ok(())
    }

    pub fn reply_primary(&self, request: Option<&Request>) -> Result<(), LinkError> {
        self.reply_raw(&reply::encode_primary(request)?)
    }

    pub fn reply_stop_required(&self, required: bool) -> Result<(), LinkError> {
        self.reply_raw(&reply::encode_stop_required(required))
    }

    pub fn reply_status(&self, status: &ElevatorStatus) -> Result<(), LinkError> {
        self.reply_raw(&reply::encode_status(status)?)
    }

    pub fn request_primary(&mut self, elevator_id: u8, dest: SocketAddr) -> Result<Option<Request>, LinkError> {
        self.send(&SystemMessage::NewPrimaryRequest { elevator_id }, dest)?;
        Ok(reply::decode_primary(&self.recv_raw()?)?)
    }

    pub fn request_stop_required(
        &mut self,
        elevator_id: u8,
        floor: u8,
        direction: Direction,
        dest: SocketAddr,
    ) -> Result<bool, LinkError> {
        let message = SystemMessage::IsStopRequired { elevator_id, floor, direction };
        self.send(&message, dest)?;
        reply::decode_stop_required(&self.recv_raw()?).ok_or(LinkError::EmptyReply(message.kind()))
    }

    pub fn request_status(&mut self, elevator_id: u8, dest: SocketAddr) -> Result<ElevatorStatus, LinkError> {
        self.send(&SystemMessage::StatusRequest { elevator_id }, dest)?;
        Ok(reply::decode_status(&self.recv_raw()?)?)
    }
}
