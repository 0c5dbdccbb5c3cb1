//! ICMP echo request encoding and inbound IPv4/ICMP datagram decoding.

use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::Packet;
use std::net::Ipv4Addr;
use thiserror::Error;

pub const ICMP_HEADER_LEN: usize = 8;
pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const IPV4_MAX_OPTIONS_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("datagram too short for an IPv4 header: {len} bytes")]
    Truncated { len: usize },
    #[error("unsupported IP version {0}")]
    UnsupportedVersion(u8),
    #[error("invalid IPv4 header length {header_len} bytes")]
    InvalidHeaderLength { header_len: usize },
    #[error("datagram too short for an ICMP header: {available} bytes after the IPv4 header")]
    TruncatedIcmp { available: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    /// Header length in bytes, options included.
    pub header_length: usize,
    pub total_length: u16,
    pub time_to_live: u8,
    pub protocol: u8,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

impl IcmpHeader {
    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type == IcmpTypes::EchoReply.0
    }
}

/// Word index of the checksum field in an ICMP header.
const ICMP_CHECKSUM_WORD: usize = 1;

/// RFC 1071 Internet checksum of `data`.
///
/// Every word counts, so the checksum field of the message must be zero when
/// computing a checksum to write back into it.
pub fn internet_checksum(data: &[u8]) -> u16 {
    pnet::util::checksum(data, usize::MAX)
}

/// Checks a whole ICMP message against the checksum it carries.
pub fn verify_checksum(data: &[u8]) -> bool {
    match data.get(2..4) {
        Some(&[hi, lo]) => {
            pnet::util::checksum(data, ICMP_CHECKSUM_WORD) == u16::from_be_bytes([hi, lo])
        }
        _ => false,
    }
}

/// Builds an echo request: the 8 byte ICMP header followed by `payload`, with
/// the checksum computed over both.
pub fn encode_echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; ICMP_HEADER_LEN + payload.len()];
    if let Some(mut packet) = MutableEchoRequestPacket::new(&mut buffer) {
        packet.set_icmp_type(IcmpTypes::EchoRequest);
        packet.set_icmp_code(IcmpCode::new(0));
        packet.set_identifier(identifier);
        packet.set_sequence_number(sequence);
        packet.set_payload(payload);
        let checksum = pnet::util::checksum(packet.packet(), ICMP_CHECKSUM_WORD);
        packet.set_checksum(checksum);
    }
    buffer
}

/// Splits a datagram read from a raw ICMP socket into its IPv4 and ICMP headers.
pub fn decode_reply(datagram: &[u8]) -> Result<(Ipv4Header, IcmpHeader), ParseError> {
    let ip = Ipv4Packet::new(datagram).ok_or(ParseError::Truncated {
        len: datagram.len(),
    })?;

    let version = ip.get_version();
    if version != 4 {
        return Err(ParseError::UnsupportedVersion(version));
    }

    let header_length = ip.get_header_length() as usize * 4;
    if header_length < IPV4_MIN_HEADER_LEN
        || header_length - IPV4_MIN_HEADER_LEN > IPV4_MAX_OPTIONS_LEN
    {
        return Err(ParseError::InvalidHeaderLength {
            header_len: header_length,
        });
    }

    let icmp = datagram
        .get(header_length..)
        .and_then(EchoReplyPacket::new)
        .ok_or(ParseError::TruncatedIcmp {
            available: datagram.len().saturating_sub(header_length),
        })?;

    Ok((
        Ipv4Header {
            version,
            header_length,
            total_length: ip.get_total_length(),
            time_to_live: ip.get_ttl(),
            protocol: ip.get_next_level_protocol().0,
            source: ip.get_source(),
            destination: ip.get_destination(),
        },
        IcmpHeader {
            icmp_type: icmp.get_icmp_type().0,
            code: icmp.get_icmp_code().0,
            checksum: icmp.get_checksum(),
            identifier: icmp.get_identifier(),
            sequence: icmp.get_sequence_number(),
        },
    ))
}
