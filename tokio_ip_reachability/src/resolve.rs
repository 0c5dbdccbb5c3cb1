use crate::error::CheckError;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Icmp,
    Tcp(u16),
}

/// A resolved IPv4 target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: Ipv4Addr,
    pub protocol: Protocol,
}

impl Endpoint {
    pub fn socket_addr(&self) -> SocketAddrV4 {
        let port = match self.protocol {
            Protocol::Icmp => 0,
            Protocol::Tcp(port) => port,
        };
        SocketAddrV4::new(self.addr, port)
    }
}

/// Resolves `hostname` with the system resolver and keeps the first IPv4
/// address it returns.
pub async fn resolve(hostname: &str, protocol: Protocol) -> Result<Endpoint, CheckError> {
    let port = match protocol {
        Protocol::Icmp => 0,
        Protocol::Tcp(port) => port,
    };
    let addrs = tokio::net::lookup_host((hostname, port))
        .await
        .map_err(|e| CheckError::Resolution {
            hostname: hostname.to_string(),
            source: Arc::new(e),
        })?;

    addrs
        .filter_map(|addr| match addr.ip() {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        })
        .next()
        .map(|addr| {
            log::debug!("resolved {} to {}", hostname, addr);
            Endpoint { addr, protocol }
        })
        .ok_or_else(|| CheckError::NoIpv4Address {
            hostname: hostname.to_string(),
        })
}
