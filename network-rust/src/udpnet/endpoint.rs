use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};

use log::trace;

use super::sock;

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM: usize = 65_507;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error("address {0} is already bound")]
    AddressInUse(SocketAddr),

    #[error("endpoint {0} is closed")]
    Disconnected(SocketAddr),

    #[error("no datagram received yet, nobody to reply to")]
    NoSender,
}

/// One bound datagram endpoint.
///
/// `recv` remembers who sent the datagram it returns; `reply` answers that
/// sender. There are no retries or timeouts at this layer: a lost datagram
/// leaves the waiting side blocked.
pub trait Endpoint: Send {
    fn local_addr(&self) -> SocketAddr;

    fn send_to(&self, payload: &[u8], dest: SocketAddr) -> Result<(), NetError>;

    /// Blocks until the next datagram arrives.
    fn recv(&mut self) -> Result<Vec<u8>, NetError>;

    fn last_sender(&self) -> Option<SocketAddr>;

    fn reply(&self, payload: &[u8]) -> Result<(), NetError> {
        let dest = self.last_sender().ok_or(NetError::NoSender)?;
        self.send_to(payload, dest)
    }
}

pub struct UdpEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    last_sender: Option<SocketAddr>,
    buf: Vec<u8>,
}

impl UdpEndpoint {
    /// Binds `ip:port`. Port 0 picks a free ephemeral port.
    pub fn bind(ip: IpAddr, port: u16) -> Result<Self, NetError> {
        let socket = sock::new_endpoint(ip, port)?;
        let local_addr = socket.local_addr()?;
        Ok(UdpEndpoint {
            socket,
            local_addr,
            last_sender: None,
            buf: vec![0; MAX_DATAGRAM],
        })
    }
}

impl Endpoint for UdpEndpoint {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn send_to(&self, payload: &[u8], dest: SocketAddr) -> Result<(), NetError> {
        trace!("{} -> {}: {} bytes", self.local_addr, dest, payload.len());
        self.socket.send_to(payload, dest)?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>, NetError> {
        let (n, sender) = self.socket.recv_from(&mut self.buf)?;
        trace!("{} <- {}: {} bytes", self.local_addr, sender, n);
        self.last_sender = Some(sender);
        Ok(self.buf[..n].to_vec())
    }

    fn last_sender(&self) -> Option<SocketAddr> {
        self.last_sender
    }
}
