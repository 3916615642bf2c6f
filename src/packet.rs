use crate::checksum::checksum;

use pnet::packet::Packet;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes};
use rand::Rng;

pub const ICMP_HEADER_LEN: usize = 8;
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;
/// Largest payload that still fits an IPv4 datagram (65535 - 20 - 8).
pub const MAX_PAYLOAD_SIZE: usize = 65_507;

const ECHO_SEQUENCE: u16 = 1;

/// Picks the identifier used by every probe of one run.
pub fn new_identifier() -> u16 {
    rand::rng().random_range(1..=u16::MAX)
}

/// A fully built ICMP echo request, checksum included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    bytes: Vec<u8>,
}

impl EchoRequest {
    /// Header (type 8, code 0, identifier, sequence 1) followed by
    /// `payload_size` filler bytes where byte `i` is `i mod 256`.
    pub fn build(identifier: u16, payload_size: usize) -> EchoRequest {
        let mut buf = vec![0u8; ICMP_HEADER_LEN + payload_size];
        for (i, byte) in buf[ICMP_HEADER_LEN..].iter_mut().enumerate() {
            *byte = (i % 256) as u8;
        }

        let mut echo_packet =
            MutableEchoRequestPacket::new(&mut buf).expect("buffer always holds an ICMP header");
        echo_packet.set_icmp_type(IcmpTypes::EchoRequest);
        echo_packet.set_icmp_code(IcmpCode::new(0));
        echo_packet.set_checksum(0);
        echo_packet.set_identifier(identifier);
        echo_packet.set_sequence_number(ECHO_SEQUENCE);

        let echo_checksum = checksum(echo_packet.packet());
        echo_packet.set_checksum(echo_checksum);

        EchoRequest { bytes: buf }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
