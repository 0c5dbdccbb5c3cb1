use crate::check::session::ProbeSession;
use crate::error::CheckError;
use serde::{Serialize, Serializer};
use std::fmt;

fn serialize_error<S: Serializer>(error: &Option<CheckError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => s.serialize_some(&error.to_string()),
        None => s.serialize_none(),
    }
}

/// Outcome of an ICMP check.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub hostname: String,
    pub remote_addr: String,
    pub success: bool,
    /// Accumulated round trip time divided by the number of probes, in whole
    /// milliseconds.
    pub average_rtt_ms: u64,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<CheckError>,
}

impl ProbeResult {
    /// Result of a check that failed before a session could exist.
    pub fn unresolved(hostname: &str, error: CheckError) -> Self {
        Self {
            hostname: hostname.to_string(),
            remote_addr: String::new(),
            success: false,
            average_rtt_ms: 0,
            error: Some(error),
        }
    }
}

pub fn finalize(session: &ProbeSession) -> ProbeResult {
    ProbeResult {
        hostname: session.hostname().to_string(),
        remote_addr: session.endpoint().addr.to_string(),
        success: session.success(),
        average_rtt_ms: session.average_ms(),
        error: session.error().cloned(),
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20} : {}", "hostname", self.hostname)?;
        writeln!(f, "{:<20} : {}", "remote address", self.remote_addr)?;
        writeln!(f, "{:<20} : {}ms", "reply time", self.average_rtt_ms)?;
        writeln!(f, "{:<20} : {}", "icmp test succeeded", self.success)
    }
}

/// Outcome of a TCP connect check.
#[derive(Debug, Clone, Serialize)]
pub struct TcpCheckResult {
    pub hostname: String,
    pub remote_addr: String,
    pub port: u16,
    pub success: bool,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<CheckError>,
}

impl fmt::Display for TcpCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20} : {}", "hostname", self.hostname)?;
        writeln!(f, "{:<20} : {}", "remote address", self.remote_addr)?;
        writeln!(f, "{:<20} : {}", "port", self.port)?;
        writeln!(f, "{:<20} : {}", "tcp test succeeded", self.success)
    }
}
