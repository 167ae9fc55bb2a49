//! Datagram endpoints used by every process in the bank.
//!
//! All traffic is request/response over unconnected datagrams. Replies are
//! routed positionally: whoever answers next sends to the endpoint that
//! delivered the most recent inbound datagram.

pub mod endpoint;
pub mod memory;
mod sock;

pub use endpoint::{Endpoint, NetError, UdpEndpoint, MAX_DATAGRAM};
pub use memory::{MemoryEndpoint, MemoryNetwork};
