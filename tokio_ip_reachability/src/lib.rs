//! Reachability checks against a single host: ICMP echo round trips over a raw
//! socket, or a plain TCP connect.
//!
//! Raw sockets are Unix only and usually need elevated privileges.

pub mod check;
pub mod configuration;
pub mod error;
pub mod packet;
pub mod resolve;
pub mod result;

#[cfg(test)]
pub(crate) mod testing;

pub use check::icmp::IcmpChecker;
pub use check::tcp::TcpChecker;
pub use check::{CheckTarget, Checker, Report};
pub use configuration::CheckConfiguration;
pub use error::CheckError;
pub use result::{ProbeResult, TcpCheckResult};
