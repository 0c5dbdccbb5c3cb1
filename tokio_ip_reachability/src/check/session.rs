use crate::error::CheckError;
use crate::packet::{self, ParseError};
use crate::resolve::Endpoint;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_SEQUENCE_MAX: u16 = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_PAYLOAD: &[u8] = b"\"Hello!\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    Sending,
    AwaitingReply,
    Matched,
    TimedOut,
    Stopped,
}

/// Outcome of asking the session for its next probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDecision {
    Transmit {
        packet: Vec<u8>,
        destination: Ipv4Addr,
        deadline: Instant,
    },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    Advance,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    Malformed(ParseError),
    NotEchoReply { icmp_type: u8 },
    ForeignIdentifier(u16),
    StaleSequence(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// First reply for the outstanding probe: its timer is cancelled and the
    /// next probe is due now.
    Matched { rtt: Duration },
    /// Further copy of an already answered probe.
    Duplicate { rtt: Duration },
    Discarded(Discard),
    Ignored,
}

/// State of one ICMP check against a single resolved target.
#[derive(Debug)]
pub struct ProbeSession {
    hostname: String,
    endpoint: Endpoint,
    identifier: u16,
    sequence: u16,
    sequence_max: u16,
    timeout: Duration,
    payload: Vec<u8>,
    state: ProbeState,
    replies: usize,
    total_replies: usize,
    total_latency_ms: u64,
    sent_at: Option<Instant>,
    success: bool,
    average_ms: u64,
    error: Option<CheckError>,
}

impl ProbeSession {
    pub fn new(hostname: impl Into<String>, endpoint: Endpoint, identifier: u16) -> Self {
        Self {
            hostname: hostname.into(),
            endpoint,
            identifier,
            sequence: 0,
            sequence_max: DEFAULT_SEQUENCE_MAX,
            timeout: DEFAULT_TIMEOUT,
            payload: DEFAULT_PAYLOAD.to_vec(),
            state: ProbeState::Idle,
            replies: 0,
            total_replies: 0,
            total_latency_ms: 0,
            sent_at: None,
            success: false,
            average_ms: 0,
            error: None,
        }
    }

    pub fn with_sequence_max(mut self, sequence_max: u16) -> Self {
        self.sequence_max = sequence_max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn start(&mut self) {
        if self.state == ProbeState::Idle {
            self.state = ProbeState::Sending;
        }
    }

    /// Prepares the next echo request, or stops the session once the last
    /// sequence has been used.
    pub fn send_probe(&mut self, now: Instant) -> SendDecision {
        if self.is_stopped() {
            return SendDecision::Finished;
        }
        if self.sequence >= self.sequence_max {
            self.stop();
            return SendDecision::Finished;
        }

        self.state = ProbeState::Sending;
        self.sequence += 1;
        let packet = packet::encode_echo_request(self.identifier, self.sequence, &self.payload);
        self.sent_at = Some(now);
        self.replies = 0;
        self.state = ProbeState::AwaitingReply;
        SendDecision::Transmit {
            packet,
            destination: self.endpoint.addr,
            deadline: now + self.timeout,
        }
    }

    pub fn on_timeout(&mut self) -> TimeoutOutcome {
        if self.is_stopped() {
            return TimeoutOutcome::Ignored;
        }
        self.state = ProbeState::TimedOut;
        TimeoutOutcome::Advance
    }

    pub fn on_datagram(&mut self, datagram: &[u8], now: Instant) -> ReplyOutcome {
        if self.is_stopped() {
            return ReplyOutcome::Ignored;
        }

        let icmp = match packet::decode_reply(datagram) {
            Ok((_, icmp)) => icmp,
            Err(e) => return ReplyOutcome::Discarded(Discard::Malformed(e)),
        };
        if !icmp.is_echo_reply() {
            return ReplyOutcome::Discarded(Discard::NotEchoReply {
                icmp_type: icmp.icmp_type,
            });
        }
        if icmp.identifier != self.identifier {
            return ReplyOutcome::Discarded(Discard::ForeignIdentifier(icmp.identifier));
        }
        if icmp.sequence != self.sequence {
            return ReplyOutcome::Discarded(Discard::StaleSequence(icmp.sequence));
        }
        let sent_at = match self.sent_at {
            Some(sent_at) => sent_at,
            None => return ReplyOutcome::Discarded(Discard::StaleSequence(icmp.sequence)),
        };

        let rtt = now.saturating_duration_since(sent_at);
        self.total_latency_ms += rtt.as_millis() as u64;
        let first = self.replies == 0;
        self.replies += 1;
        self.total_replies += 1;
        if first {
            self.state = ProbeState::Matched;
            ReplyOutcome::Matched { rtt }
        } else {
            ReplyOutcome::Duplicate { rtt }
        }
    }

    /// Records a fatal error and stops. Only the first error is kept.
    pub fn fail(&mut self, error: CheckError) {
        if self.error.is_none() && !self.is_stopped() {
            self.error = Some(error);
        }
        self.stop();
    }

    /// Returns true the one time the session actually transitions to stopped.
    pub fn stop(&mut self) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.state = ProbeState::Stopped;
        self.success = self.total_replies > 0;
        self.average_ms = if self.sequence_max == 0 {
            0
        } else {
            self.total_latency_ms / self.sequence_max as u64
        };
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.state == ProbeState::Stopped
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn sequence_max(&self) -> u16 {
        self.sequence_max
    }

    pub fn replies(&self) -> usize {
        self.replies
    }

    pub fn total_replies(&self) -> usize {
        self.total_replies
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.total_latency_ms
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn average_ms(&self) -> u64 {
        self.average_ms
    }

    pub fn error(&self) -> Option<&CheckError> {
        self.error.as_ref()
    }
}
