use crate::error::ProbeError;
use crate::packet::EchoRequest;

use pnet::packet::Packet;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::TransportChannelType::Layer4;
use pnet::transport::TransportProtocol::Ipv4;
use pnet::transport::{TransportReceiver, TransportSender, icmp_packet_iter, transport_channel};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::{debug, trace};

pub const RECV_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_TTL: u8 = 64;

// SO_RCVTIMEO of zero means "block forever"
const MIN_WAIT: Duration = Duration::from_millis(1);

/// An ICMP message received from the network, outer IP header removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub source: Ipv4Addr,
    pub message: Vec<u8>,
}

/// Sends echo requests and hands back whatever ICMP arrives.
pub trait IcmpTransport {
    /// Sends `packet` to `destination`. A `ttl` applies to this send only.
    fn send_to(&mut self, packet: &EchoRequest, destination: Ipv4Addr, ttl: Option<u8>) -> Result<(), ProbeError>;

    /// Waits at most `timeout` for one inbound message.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, ProbeError>;
}

impl<T: IcmpTransport + ?Sized> IcmpTransport for &mut T {
    fn send_to(&mut self, packet: &EchoRequest, destination: Ipv4Addr, ttl: Option<u8>) -> Result<(), ProbeError> {
        (**self).send_to(packet, destination, ttl)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, ProbeError> {
        (**self).recv_timeout(timeout)
    }
}

/// Raw IPv4 ICMP socket. Closed when dropped.
pub struct RawIcmpTransport {
    transport_sender: TransportSender,
    transport_receiver: TransportReceiver,
    ttl_overridden: bool,
}

impl RawIcmpTransport {
    pub fn open() -> Result<RawIcmpTransport, ProbeError> {
        let (transport_sender, transport_receiver) =
            transport_channel(RECV_BUFFER_SIZE, Layer4(Ipv4(IpNextHeaderProtocols::Icmp)))
                .map_err(ProbeError::from_socket_open)?;
        debug!("opened raw ICMP socket");
        Ok(RawIcmpTransport { transport_sender, transport_receiver, ttl_overridden: false })
    }

    fn apply_ttl(&mut self, ttl: Option<u8>) -> io::Result<()> {
        match ttl {
            Some(ttl) => {
                self.transport_sender.set_ttl(ttl)?;
                self.ttl_overridden = true;
            }
            None if self.ttl_overridden => {
                self.transport_sender.set_ttl(DEFAULT_TTL)?;
                self.ttl_overridden = false;
            }
            None => {}
        }
        Ok(())
    }
}

impl IcmpTransport for RawIcmpTransport {
    fn send_to(&mut self, packet: &EchoRequest, destination: Ipv4Addr, ttl: Option<u8>) -> Result<(), ProbeError> {
        self.apply_ttl(ttl).map_err(|source| ProbeError::SendFailed { destination, source })?;

        let icmp_packet = IcmpPacket::new(packet.as_bytes())
            .ok_or_else(|| ProbeError::Internal(format!("echo request of {} bytes", packet.len())))?;
        self.transport_sender
            .send_to(icmp_packet, IpAddr::V4(destination))
            .map_err(|source| ProbeError::SendFailed { destination, source })?;

        trace!(%destination, ?ttl, bytes = packet.len(), "sent echo request");
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, ProbeError> {
        // pnet's iterator unwraps `IcmpPacket::new`, so a datagram with fewer
        // than 4 ICMP bytes would panic here. Linux raw ICMP sockets never
        // deliver those; anything shorter than the 8-byte header is still
        // rejected by `parser::parse`.
        let mut packets = icmp_packet_iter(&mut self.transport_receiver);
        match packets.next_with_timeout(timeout.max(MIN_WAIT)) {
            Ok(Some((icmp_packet, IpAddr::V4(source)))) => Ok(Some(Inbound {
                source,
                message: icmp_packet.packet().to_vec(),
            })),
            Ok(Some((_, IpAddr::V6(_)))) | Ok(None) => Ok(None),
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(ProbeError::ReceiveFailed(e)),
        }
    }
}

impl Drop for RawIcmpTransport {
    fn drop(&mut self) {
        debug!("closing raw ICMP socket");
    }
}
