//! Datagram builders and a simulated ICMP responder for unit tests.

use crate::check::socket::IcmpTransport;
use crate::packet::ICMP_HEADER_LEN;
use pnet::packet::icmp::echo_reply::MutableEchoReplyPacket;
use pnet::packet::icmp::echo_request::EchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{checksum as ipv4_checksum, MutableIpv4Packet};
use pnet::packet::Packet;
use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Wraps `payload` in an IPv4 header carrying `options_len` bytes of options.
pub fn ipv4_datagram(source: Ipv4Addr, options_len: usize, payload: &[u8]) -> Vec<u8> {
    let header_len = 20 + options_len;
    let mut buffer = vec![0u8; header_len + payload.len()];
    let mut ip = MutableIpv4Packet::new(&mut buffer).unwrap();
    ip.set_version(4);
    ip.set_header_length((header_len / 4) as u8);
    ip.set_total_length((header_len + payload.len()) as u16);
    ip.set_ttl(64);
    ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
    ip.set_source(source);
    ip.set_destination(Ipv4Addr::new(10, 0, 0, 1));
    let csum = ipv4_checksum(&ip.to_immutable());
    ip.set_checksum(csum);
    drop(ip);
    buffer[header_len..].copy_from_slice(payload);
    buffer
}

pub fn echo_reply_datagram(
    source: Ipv4Addr,
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut icmp = vec![0u8; ICMP_HEADER_LEN + payload.len()];
    let mut reply = MutableEchoReplyPacket::new(&mut icmp).unwrap();
    reply.set_icmp_type(IcmpTypes::EchoReply);
    reply.set_icmp_code(IcmpCode::new(0));
    reply.set_identifier(identifier);
    reply.set_sequence_number(sequence);
    reply.set_payload(payload);
    let csum = pnet::util::checksum(reply.packet(), 1);
    reply.set_checksum(csum);
    ipv4_datagram(source, 0, &icmp)
}

/// What the simulated network does with one outgoing request.
#[derive(Debug, Clone)]
pub enum Response {
    /// Echo the request back after the given delay.
    Reply(Duration),
    /// Echo the request back `n` times after the given delay.
    Duplicate(Duration, usize),
    /// Deliver an arbitrary datagram after the given delay, then echo the request.
    Preceded(Duration, Vec<u8>, Duration),
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    pub destination: Ipv4Addr,
    pub identifier: u16,
    pub sequence: u16,
    pub at: tokio::time::Instant,
}

/// In-memory transport: each sent request consumes the next scripted
/// `Response`, and replies are delivered through a channel after a (paused)
/// tokio sleep.
pub struct SimulatedNetwork {
    script: Vec<Response>,
    sent: Vec<Sent>,
    fail_send_at: Option<u16>,
    fail_recv_after: Option<usize>,
    delivered: usize,
    inbox_tx: mpsc::UnboundedSender<Vec<u8>>,
    inbox_rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl SimulatedNetwork {
    pub fn new(script: Vec<Response>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            script,
            sent: vec![],
            fail_send_at: None,
            fail_recv_after: None,
            delivered: 0,
            inbox_tx,
            inbox_rx,
        }
    }

    /// Makes the send of sequence `sequence` fail.
    pub fn failing_at(mut self, sequence: u16) -> Self {
        self.fail_send_at = Some(sequence);
        self
    }

    /// Makes every receive fail once `delivered` datagrams have been read.
    pub fn failing_recv_after(mut self, delivered: usize) -> Self {
        self.fail_recv_after = Some(delivered);
        self
    }

    /// Queues a datagram as if it had arrived after `delay`.
    pub fn inject(&self, delay: Duration, datagram: Vec<u8>) {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(datagram);
        });
    }

    pub fn sent(&self) -> &[Sent] {
        &self.sent
    }
}

impl IcmpTransport for SimulatedNetwork {
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()> {
        let request = EchoRequestPacket::new(packet).unwrap();
        let identifier = request.get_identifier();
        let sequence = request.get_sequence_number();
        if self.fail_send_at == Some(sequence) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated send failure",
            ));
        }
        self.sent.push(Sent {
            destination,
            identifier,
            sequence,
            at: tokio::time::Instant::now(),
        });

        let reply = echo_reply_datagram(destination, identifier, sequence, request.payload());
        let response = if self.script.is_empty() {
            Response::Drop
        } else {
            self.script.remove(0)
        };
        match response {
            Response::Reply(delay) => self.inject(delay, reply),
            Response::Duplicate(delay, n) => {
                for _ in 0..n {
                    self.inject(delay, reply.clone());
                }
            }
            Response::Preceded(first_delay, datagram, delay) => {
                self.inject(first_delay, datagram);
                self.inject(delay, reply);
            }
            Response::Drop => (),
        }
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_recv_after.is_some_and(|n| self.delivered >= n) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "simulated receive failure",
            ));
        }
        match self.inbox_rx.recv().await {
            Some(datagram) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                self.delivered += 1;
                Ok(len)
            }
            // The sender half lives in `self`, so this never happens
            None => std::future::pending().await,
        }
    }
}
