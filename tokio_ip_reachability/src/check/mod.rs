pub mod icmp;
pub mod session;
pub mod socket;
pub mod tcp;

pub use crate::error::CheckError;
use crate::result::{ProbeResult, TcpCheckResult};
use std::fmt;
use std::future::Future;

/// What a checker is pointed at. `port` is only used by the TCP checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTarget {
    pub hostname: String,
    pub port: u16,
}

impl CheckTarget {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }
}

/// Final record of a check, printable by the caller.
pub trait Report: fmt::Display + serde::Serialize {
    fn error(&self) -> Option<&CheckError>;
}

impl Report for ProbeResult {
    fn error(&self) -> Option<&CheckError> {
        self.error.as_ref()
    }
}

impl Report for TcpCheckResult {
    fn error(&self) -> Option<&CheckError> {
        self.error.as_ref()
    }
}

pub trait Checker {
    type Report: Report;

    fn check(&mut self, target: &CheckTarget) -> impl Future<Output = Self::Report>;
}
