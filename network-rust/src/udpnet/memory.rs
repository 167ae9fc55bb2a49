use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::debug;

use super::endpoint::{Endpoint, NetError};

type Datagram = (SocketAddr, Vec<u8>);

const FIRST_EPHEMERAL_PORT: u16 = 49152;

struct Routes {
    next_port: u16,
    inboxes: HashMap<SocketAddr, Sender<Datagram>>,
}

/// An in-process datagram network. Endpoints bound on the same
/// `MemoryNetwork` reach each other by address, with the same fire-and-forget
/// semantics as local UDP: datagrams to unbound addresses are dropped.
#[derive(Clone)]
pub struct MemoryNetwork {
    routes: Arc<Mutex<Routes>>,
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNetwork {
    pub fn new() -> Self {
        MemoryNetwork {
            routes: Arc::new(Mutex::new(Routes {
                next_port: FIRST_EPHEMERAL_PORT,
                inboxes: HashMap::new(),
            })),
        }
    }

    pub fn host() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    fn routes(&self) -> MutexGuard<'_, Routes> {
        // A poisoned route table only means another test thread panicked.
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Binds `port` on this network. Port 0 picks an unused ephemeral port.
    pub fn bind(&self, port: u16) -> Result<MemoryEndpoint, NetError> {
        let mut routes = self.routes();
        let addr = if port == 0 {
            loop {
                let candidate = SocketAddr::new(Self::host(), routes.next_port);
                routes.next_port = routes.next_port.checked_add(1).unwrap_or(FIRST_EPHEMERAL_PORT);
                if !routes.inboxes.contains_key(&candidate) {
                    break candidate;
                }
            }
        } else {
            SocketAddr::new(Self::host(), port)
        };
        if routes.inboxes.contains_key(&addr) {
            return Err(NetError::AddressInUse(addr));
        }
        let (tx, rx) = unbounded();
        routes.inboxes.insert(addr, tx);
        Ok(MemoryEndpoint {
            network: self.clone(),
            addr,
            inbox: rx,
            last_sender: None,
        })
    }

    fn deliver(&self, from: SocketAddr, payload: &[u8], dest: SocketAddr) {
        let routes = self.routes();
        match routes.inboxes.get(&dest) {
            Some(inbox) => {
                let _ = inbox.send((from, payload.to_vec()));
            }
            None => debug!("{} -> {}: nobody bound, datagram dropped", from, dest),
        }
    }
}

pub struct MemoryEndpoint {
    network: MemoryNetwork,
    addr: SocketAddr,
    inbox: Receiver<Datagram>,
    last_sender: Option<SocketAddr>,
}

impl MemoryEndpoint {
    /// Like `recv`, but gives up after `timeout`. Used by tests that must not
    /// hang when a datagram never comes.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, NetError> {
        match self.inbox.recv_timeout(timeout) {
            Ok((sender, payload)) => {
                self.last_sender = Some(sender);
                Ok(Some(payload))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(NetError::Disconnected(self.addr)),
        }
    }
}

impl Endpoint for MemoryEndpoint {
    fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    fn send_to(&self, payload: &[u8], dest: SocketAddr) -> Result<(), NetError> {
        self.network.deliver(self.addr, payload, dest);
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>, NetError> {
        let (sender, payload) = self
            .inbox
            .recv()
            .map_err(|_| NetError::Disconnected(self.addr))?;
        self.last_sender = Some(sender);
        Ok(payload)
    }

    fn last_sender(&self) -> Option<SocketAddr> {
        self.last_sender
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        self.network.routes().inboxes.remove(&self.addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_port_cannot_be_bound_twice() {
        let network = MemoryNetwork::new();
        let _first = network.bind(50000).unwrap();
        assert!(matches!(network.bind(50000), Err(NetError::AddressInUse(_))));
    }

    #[test]
    fn port_is_released_on_drop() {
        let network = MemoryNetwork::new();
        drop(network.bind(50000).unwrap());
        assert!(network.bind(50000).is_ok());
    }

    #[test]
    fn ephemeral_ports_are_distinct() {
        let network = MemoryNetwork::new();
        let a = network.bind(0).unwrap();
        let b = network.bind(0).unwrap();
        assert_ne!(a.local_addr(), b.local_addr());
    }

    #[test]
    fn datagram_to_unbound_address_is_dropped() {
        let network = MemoryNetwork::new();
        let a = network.bind(0).unwrap();
        let nowhere = SocketAddr::new(MemoryNetwork::host(), 1);
        assert!(a.send_to(b"lost", nowhere).is_ok());
    }

    #[test]
    fn reply_routes_to_last_sender() {
        let network = MemoryNetwork::new();
        let mut server = network.bind(50000).unwrap();
        let mut client = network.bind(0).unwrap();

        client.send_to(b"ping", server.local_addr()).unwrap();
        assert_eq!(server.recv().unwrap(), b"ping");
        assert_eq!(server.last_sender(), Some(client.local_addr()));

        server.reply(b"pong").unwrap();
        let reply = client.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(reply.as_deref(), Some(&b"pong"[..]));
    }

    #[test]
    fn recv_timeout_returns_none_when_quiet() {
        let network = MemoryNetwork::new();
        let mut endpoint = network.bind(0).unwrap();
        assert_eq!(endpoint.recv_timeout(Duration::from_millis(10)).unwrap(), None);
    }
}
