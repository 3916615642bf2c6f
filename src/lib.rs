//! ICMP ping and traceroute over IPv4 raw sockets.

pub mod checksum;
pub mod dns_resolver;
pub mod error;
pub mod listener;
pub mod messages;
pub mod packet;
pub mod parser;
pub mod pinger;
pub mod tracer;
pub mod transport;

pub use error::ProbeError;
pub use listener::PacketListener;
pub use messages::Observation;
pub use packet::{EchoRequest, new_identifier};
pub use pinger::{PingConfig, PingSummary, Pinger};
pub use tracer::{HopRecord, TraceConfig, TraceOutcome, Tracer};
pub use transport::{IcmpTransport, Inbound, RawIcmpTransport};
