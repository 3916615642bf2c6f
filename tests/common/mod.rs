#![allow(dead_code)]

use pathprobe::checksum::checksum;
use pathprobe::transport::DEFAULT_TTL;
use pathprobe::{EchoRequest, IcmpTransport, Inbound, ProbeError};
use pnet::packet::icmp::time_exceeded::MutableTimeExceededPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes, MutableIcmpPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::MutableIpv4Packet;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

pub const PROBER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
pub const FOREIGN_ID: u16 = 0xA5A5;

pub fn seal(message: &mut [u8]) {
    message[2] = 0;
    message[3] = 0;
    let sum = checksum(message);
    message[2..4].copy_from_slice(&sum.to_be_bytes());
}

pub fn echo_reply_for(request: &[u8]) -> Vec<u8> {
    let mut reply = request.to_vec();
    MutableIcmpPacket::new(&mut reply).unwrap().set_icmp_type(IcmpTypes::EchoReply);
    seal(&mut reply);
    reply
}

pub fn time_exceeded_for(request: &[u8], target: Ipv4Addr) -> Vec<u8> {
    let mut quote = vec![0u8; 20 + 8];
    {
        let mut ip = MutableIpv4Packet::new(&mut quote).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length((20 + request.len()) as u16);
        ip.set_ttl(1);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
        ip.set_source(PROBER);
        ip.set_destination(target);
    }
    quote[20..].copy_from_slice(&request[..8]);

    let mut message = vec![0u8; 8 + quote.len()];
    {
        let mut exceeded = MutableTimeExceededPacket::new(&mut message).unwrap();
        exceeded.set_icmp_type(IcmpTypes::TimeExceeded);
        exceeded.set_icmp_code(IcmpCode::new(0));
        exceeded.set_payload(&quote);
    }
    seal(&mut message);
    message
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub destination: Ipv4Addr,
    pub ttl: Option<u8>,
    pub bytes: Vec<u8>,
}

/// A network path of routers in front of a target.
///
/// A probe whose TTL runs out at router `n` gets a time exceeded from that
/// router (or nothing, if the router is `None`); probes that get past every
/// router are answered by the target with an echo reply.
pub struct SimulatedPath {
    pub routers: Vec<Option<Ipv4Addr>>,
    pub target: Ipv4Addr,
    pub target_answers: bool,
    /// 1-based send numbers that get no answer at all.
    pub dropped: Vec<usize>,
    /// Deliver unrelated ICMP before every answer.
    pub noisy: bool,
    pub sent: Vec<Sent>,
    pending: VecDeque<Inbound>,
}

impl SimulatedPath {
    pub fn new(routers: Vec<Option<Ipv4Addr>>, target: Ipv4Addr) -> SimulatedPath {
        SimulatedPath {
            routers,
            target,
            target_answers: true,
            dropped: Vec::new(),
            noisy: false,
            sent: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn direct(target: Ipv4Addr) -> SimulatedPath {
        SimulatedPath::new(Vec::new(), target)
    }

    pub fn sent_ttls(&self) -> Vec<Option<u8>> {
        self.sent.iter().map(|sent| sent.ttl).collect()
    }

    fn push_noise(&mut self, source: Ipv4Addr) {
        let foreign = EchoRequest::build(FOREIGN_ID, 8);
        self.pending.push_back(Inbound { source, message: echo_reply_for(foreign.as_bytes()) });
        self.pending.push_back(Inbound { source, message: time_exceeded_for(foreign.as_bytes(), self.target) });
        self.pending.push_back(Inbound { source, message: vec![0x00, 0x00] });
    }
}

impl IcmpTransport for SimulatedPath {
    fn send_to(&mut self, packet: &EchoRequest, destination: Ipv4Addr, ttl: Option<u8>) -> Result<(), ProbeError> {
        self.sent.push(Sent { destination, ttl, bytes: packet.as_bytes().to_vec() });
        if self.dropped.contains(&self.sent.len()) {
            return Ok(());
        }

        let ttl = ttl.unwrap_or(DEFAULT_TTL).max(1) as usize;
        let answer = if ttl <= self.routers.len() {
            self.routers[ttl - 1].map(|router| Inbound {
                source: router,
                message: time_exceeded_for(packet.as_bytes(), destination),
            })
        } else if self.target_answers {
            Some(Inbound { source: self.target, message: echo_reply_for(packet.as_bytes()) })
        } else {
            None
        };

        if let Some(answer) = answer {
            if self.noisy {
                self.push_noise(answer.source);
            }
            self.pending.push_back(answer);
        }
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, ProbeError> {
        match self.pending.pop_front() {
            Some(inbound) => Ok(Some(inbound)),
            None => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}
