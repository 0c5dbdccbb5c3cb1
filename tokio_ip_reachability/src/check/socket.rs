use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::future::Future;
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::io::unix::AsyncFd;

/// Largest datagram a receive accepts.
pub const RECV_BUFFER_SIZE: usize = 65_536;

/// Where echo requests go out and every inbound ICMP datagram comes in.
///
/// Sending does not suspend; receiving yields whole datagrams, IPv4 header
/// included.
pub trait IcmpTransport {
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()>;

    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>>;
}

/// Raw IPv4 ICMP socket registered with the tokio reactor.
///
/// Opening one usually needs root or `CAP_NET_RAW`.
pub struct RawIcmpSocket {
    io: AsyncFd<Socket>,
}

impl RawIcmpSocket {
    pub fn open() -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        socket.set_nonblocking(true)?;
        let io = AsyncFd::new(socket)?;
        Ok(Self { io })
    }
}

impl IcmpTransport for RawIcmpSocket {
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()> {
        let addr = SockAddr::from(SocketAddrV4::new(destination, 0));
        let sent = self.io.get_ref().send_to(packet, &addr)?;
        if sent != packet.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, packet.len()),
            ));
        }
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.io.readable().await?;
            match guard.try_io(|inner| {
                let mut socket: &Socket = inner.get_ref();
                socket.read(buf)
            }) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}
