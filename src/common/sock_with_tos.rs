use socket2::{Domain, SockAddr, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Build the UDP socket for the control endpoint with a low-delay TOS mark
/// so control traffic is not queued behind bulk flows on a busy link.
pub fn new(port: u16) -> std::io::Result<UdpSocket> {
    let raw_sock = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
    raw_sock.set_tos(0x10)?;
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port);
    raw_sock.bind(&SockAddr::from(addr))?;
    Ok(UdpSocket::from(raw_sock))
}

#[cfg(test)]
mod test_sock_with_tos {
    use super::*;

    #[test]
    fn build_socket() {
        let sock = new(0).unwrap();
        let port = sock.local_addr().unwrap().port();
        assert!(port != 0);
    }

    #[test]
    fn port_in_use() {
        let first = new(0).unwrap();
        let port = first.local_addr().unwrap().port();
        let second = new(port);
        assert!(second.is_err());
    }
}
