use std::io;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Fatal failures of a check. Malformed inbound datagrams are never reported
/// here, they are dropped by the receive loop.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("failed to resolve {hostname}: {source}")]
    Resolution {
        hostname: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("{hostname} has no IPv4 address")]
    NoIpv4Address { hostname: String },
    #[error("failed to open raw ICMP socket: {0}")]
    Socket(#[source] Arc<io::Error>),
    #[error("failed to send echo request: {0}")]
    Transmit(#[source] Arc<io::Error>),
    #[error("failed to receive from raw ICMP socket: {0}")]
    Receive(#[source] Arc<io::Error>),
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddrV4,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: SocketAddrV4, timeout: Duration },
}

impl CheckError {
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. } | Self::NoIpv4Address { .. })
    }
}
