use std::io;
use std::net;

use socket2::{Domain, Protocol, Socket, Type};

pub fn new_endpoint(ip: net::IpAddr, port: u16) -> io::Result<net::UdpSocket> {
    let domain = if ip.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let sock = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    let local_addr = net::SocketAddr::new(ip, port);
    sock.bind(&local_addr.into())?;
    Ok(sock.into())
}
