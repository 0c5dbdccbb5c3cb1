use super::session::{ProbeSession, ReplyOutcome, SendDecision, TimeoutOutcome};
use super::socket::{IcmpTransport, RawIcmpSocket, RECV_BUFFER_SIZE};
use super::{CheckTarget, Checker};
use crate::configuration::CheckConfiguration;
use crate::error::CheckError;
use crate::resolve::{self, Endpoint, Protocol};
use crate::result::{self, ProbeResult};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{self, Instant};

/// Drives ICMP echo sessions over one transport.
///
/// A session runs on the current task only: the timer, the pending receive and
/// the cancellation signal are polled by a single `select!`, so the session is
/// never touched concurrently.
pub struct IcmpChecker<T = RawIcmpSocket> {
    transport: T,
    configuration: CheckConfiguration,
}

impl IcmpChecker<RawIcmpSocket> {
    pub fn open(configuration: CheckConfiguration) -> Result<Self, CheckError> {
        let transport = RawIcmpSocket::open().map_err(|e| CheckError::Socket(Arc::new(e)))?;
        Ok(Self::with_transport(transport, configuration))
    }
}

impl<T: IcmpTransport> IcmpChecker<T> {
    pub fn with_transport(transport: T, configuration: CheckConfiguration) -> Self {
        Self {
            transport,
            configuration,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// New session for `endpoint` with a fresh random identifier.
    pub fn session(&self, hostname: &str, endpoint: Endpoint) -> ProbeSession {
        ProbeSession::new(hostname, endpoint, rand::random())
            .with_sequence_max(self.configuration.sequence_max)
            .with_timeout(self.configuration.timeout)
            .with_payload(self.configuration.payload.as_bytes())
    }

    /// Resolves `hostname` then probes it until every sequence is used or
    /// `cancel` completes.
    pub async fn check_until<F>(&mut self, hostname: &str, cancel: F) -> ProbeResult
    where
        F: Future<Output = ()>,
    {
        let endpoint = match resolve::resolve(hostname, Protocol::Icmp).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                log::warn!("{}", e);
                return ProbeResult::unresolved(hostname, e);
            }
        };
        let mut session = self.session(hostname, endpoint);
        self.run(&mut session, cancel).await;
        result::finalize(&session)
    }

    pub async fn run<F>(&mut self, session: &mut ProbeSession, cancel: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        session.start();
        let mut deadline = match self.advance(session) {
            Some(deadline) => deadline,
            None => return,
        };

        while !session.is_stopped() {
            tokio::select! {
                _ = &mut cancel => {
                    if session.stop() {
                        log::debug!("{}: cancelled at icmp_seq={}", session.hostname(), session.sequence());
                    }
                }
                _ = time::sleep_until(deadline) => {
                    if session.on_timeout() == TimeoutOutcome::Advance {
                        log::debug!(
                            "{}: icmp_seq={} timed out",
                            session.hostname(),
                            session.sequence()
                        );
                        if let Some(next) = self.advance(session) {
                            deadline = next;
                        }
                    }
                }
                received = self.transport.recv(&mut buf) => match received {
                    Ok(len) => match session.on_datagram(&buf[..len], Instant::now()) {
                        ReplyOutcome::Matched { rtt } => {
                            log::debug!(
                                "{}: reply for icmp_seq={} in {:?}",
                                session.hostname(),
                                session.sequence(),
                                rtt
                            );
                            // The reply cancels the pending timer; the next probe goes out now
                            if let Some(next) = self.advance(session) {
                                deadline = next;
                            }
                        }
                        ReplyOutcome::Duplicate { rtt } => {
                            log::trace!("{}: duplicate reply in {:?}", session.hostname(), rtt);
                        }
                        ReplyOutcome::Discarded(reason) => {
                            log::trace!("{}: dropped datagram: {:?}", session.hostname(), reason);
                        }
                        ReplyOutcome::Ignored => (),
                    },
                    Err(e) => {
                        log::warn!("{}: receive failed: {}", session.hostname(), e);
                        session.fail(CheckError::Receive(Arc::new(e)));
                    }
                },
            }
        }

        log::info!(
            "{}: {} of {} probes answered, average {}ms",
            session.hostname(),
            session.total_replies(),
            session.sequence_max(),
            session.average_ms()
        );
    }

    /// Sends the next probe and returns its deadline, or `None` once the
    /// session is stopped.
    fn advance(&mut self, session: &mut ProbeSession) -> Option<Instant> {
        match session.send_probe(Instant::now()) {
            SendDecision::Finished => None,
            SendDecision::Transmit {
                packet,
                destination,
                deadline,
            } => match self.transport.send_to(&packet, destination) {
                Ok(()) => {
                    log::debug!(
                        "{}: sent icmp_seq={} id={:#06x} to {}",
                        session.hostname(),
                        session.sequence(),
                        session.identifier(),
                        destination
                    );
                    Some(deadline)
                }
                Err(e) => {
                    log::warn!("{}: send to {} failed: {}", session.hostname(), destination, e);
                    session.fail(CheckError::Transmit(Arc::new(e)));
                    None
                }
            },
        }
    }
}

impl<T: IcmpTransport> Checker for IcmpChecker<T> {
    type Report = ProbeResult;

    async fn check(&mut self, target: &CheckTarget) -> ProbeResult {
        self.check_until(&target.hostname, std::future::pending()).await
    }
}
