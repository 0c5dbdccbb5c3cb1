use super::{CheckTarget, Checker};
use crate::configuration::CheckConfiguration;
use crate::error::CheckError;
use crate::resolve::{self, Protocol};
use crate::result::TcpCheckResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// Resolve-then-connect check of a single TCP port. No retry.
pub struct TcpChecker {
    connect_timeout: Duration,
}

impl TcpChecker {
    pub fn new(configuration: &CheckConfiguration) -> Self {
        Self {
            connect_timeout: configuration.connect_timeout,
        }
    }

    pub async fn check_port(&self, hostname: &str, port: u16) -> TcpCheckResult {
        let mut result = TcpCheckResult {
            hostname: hostname.to_string(),
            remote_addr: String::new(),
            port,
            success: false,
            error: None,
        };

        let endpoint = match resolve::resolve(hostname, Protocol::Tcp(port)).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                log::warn!("{}", e);
                result.error = Some(e);
                return result;
            }
        };
        result.remote_addr = endpoint.addr.to_string();

        let addr = endpoint.socket_addr();
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {
                log::debug!("{}: connected to {}", hostname, addr);
                result.success = true;
            }
            Ok(Err(e)) => {
                log::warn!("{}: connect to {} failed: {}", hostname, addr, e);
                result.error = Some(CheckError::Connect {
                    addr,
                    source: Arc::new(e),
                });
            }
            Err(_elapsed) => {
                log::warn!("{}: connect to {} timed out", hostname, addr);
                result.error = Some(CheckError::ConnectTimeout {
                    addr,
                    timeout: self.connect_timeout,
                });
            }
        }
        result
    }
}

impl Checker for TcpChecker {
    type Report = TcpCheckResult;

    async fn check(&mut self, target: &CheckTarget) -> TcpCheckResult {
        self.check_port(&target.hostname, target.port).await
    }
}
