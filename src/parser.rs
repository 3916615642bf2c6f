use crate::checksum;

use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::EchoRequestPacket;
use pnet::packet::icmp::time_exceeded::TimeExceededPacket;
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;

/// What an inbound ICMP message means for the probe that is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    EchoReply { bytes: usize },
    TimeExceeded,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Shorter than an ICMP header.
    Truncated(usize),
    BadChecksum,
    /// Reply to a probe from another run or another program.
    ForeignIdentifier(u16),
    /// Time exceeded whose quoted datagram is not one of our echo requests.
    UnmatchedQuote,
    /// Any other ICMP type.
    Unhandled(u8),
}

/// Classifies an ICMP message (outer IP header already removed).
pub fn parse(message: &[u8], expected_identifier: u16) -> Verdict {
    if message.len() < EchoReplyPacket::minimum_packet_size() {
        return Verdict::Ignored(IgnoreReason::Truncated(message.len()));
    }
    if !checksum::is_valid(message) {
        return Verdict::Ignored(IgnoreReason::BadChecksum);
    }

    let Some(icmp_packet) = IcmpPacket::new(message) else {
        return Verdict::Ignored(IgnoreReason::Truncated(message.len()));
    };

    match icmp_packet.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let Some(reply) = EchoReplyPacket::new(message) else {
                return Verdict::Ignored(IgnoreReason::Truncated(message.len()));
            };
            let id = reply.get_identifier();
            if id != expected_identifier {
                return Verdict::Ignored(IgnoreReason::ForeignIdentifier(id));
            }
            Verdict::EchoReply { bytes: message.len() }
        }
        IcmpTypes::TimeExceeded => match quoted_identifier(message) {
            Some(id) if id == expected_identifier => Verdict::TimeExceeded,
            Some(id) => Verdict::Ignored(IgnoreReason::ForeignIdentifier(id)),
            None => Verdict::Ignored(IgnoreReason::UnmatchedQuote),
        },
        other => Verdict::Ignored(IgnoreReason::Unhandled(other.0)),
    }
}

// Time exceeded quotes the original IPv4 header plus the first 8 bytes of
// the datagram that expired, which for us is the echo request header.
fn quoted_identifier(message: &[u8]) -> Option<u16> {
    let exceeded = TimeExceededPacket::new(message)?;
    let quote = exceeded.payload();

    let original = Ipv4Packet::new(quote)?;
    if original.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return None;
    }
    let header_len = original.get_header_length() as usize * 4;
    if header_len < Ipv4Packet::minimum_packet_size() {
        return None;
    }

    let original_echo_request = EchoRequestPacket::new(quote.get(header_len..)?)?;
    if original_echo_request.get_icmp_type() != IcmpTypes::EchoRequest {
        return None;
    }
    Some(original_echo_request.get_identifier())
}
