use crate::dns_resolver::{display_name, resolve_host};
use crate::error::ProbeError;
use crate::listener::PacketListener;
use crate::messages::{Observation, format_rtt};
use crate::packet::{DEFAULT_PAYLOAD_SIZE, EchoRequest, ICMP_HEADER_LEN, new_identifier};
use crate::transport::{IcmpTransport, RawIcmpTransport};

use std::collections::BTreeMap;
use std::io::Write;
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_MAX_HOPS: u8 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct TraceConfig {
    pub max_hops: u8,
    pub probes_per_hop: u8,
    pub timeout: Duration,
    /// Pause between two consecutive probes.
    pub pause: Duration,
    pub payload_size: usize,
    /// Print hop addresses without reverse lookups.
    pub numeric: bool,
    /// Print unanswered probes per hop once the trace ends.
    pub summary: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            max_hops: DEFAULT_MAX_HOPS,
            probes_per_hop: 1,
            timeout: Duration::from_secs(5),
            pause: Duration::from_secs(1),
            payload_size: DEFAULT_PAYLOAD_SIZE,
            numeric: false,
            summary: false,
        }
    }
}

impl TraceConfig {
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.max_hops == 0 {
            return Err(ProbeError::InvalidConfig("max hops must be at least 1".to_string()));
        }
        if self.probes_per_hop == 0 {
            return Err(ProbeError::InvalidConfig("probes per hop must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Unanswered probe count per TTL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HopRecord {
    unanswered: BTreeMap<u8, u32>,
}

impl HopRecord {
    pub fn record_timeout(&mut self, ttl: u8) {
        *self.unanswered.entry(ttl).or_insert(0) += 1;
    }

    pub fn unanswered(&self, ttl: u8) -> u32 {
        self.unanswered.get(&ttl).copied().unwrap_or(0)
    }

    /// TTLs with at least one unanswered probe, in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.unanswered.iter().filter(|(_, count)| **count > 0).map(|(ttl, count)| (*ttl, *count))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOutcome {
    pub destination_reached: bool,
    /// Last TTL that was probed.
    pub hops: u8,
    pub record: HopRecord,
}

/// TTL-stepping loop over an owned transport.
pub struct Tracer<T: IcmpTransport> {
    transport: T,
    target: Ipv4Addr,
    listener: PacketListener,
    config: TraceConfig,
}

impl<T: IcmpTransport> Tracer<T> {
    pub fn new(transport: T, target: Ipv4Addr, icmp_identifier: u16, config: TraceConfig) -> Tracer<T> {
        Tracer { transport, target, listener: PacketListener::new(icmp_identifier), config }
    }

    /// Probes TTL 1, 2, ... until an echo reply arrives or `max_hops` is
    /// exhausted. One output line per TTL.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<TraceOutcome, ProbeError> {
        let mut record = HopRecord::default();
        let mut destination_reached = false;
        let mut hops = 0;
        let mut first_probe = true;

        'hops: for ttl in 1..=self.config.max_hops {
            hops = ttl;
            write!(out, "{:2} ", ttl)?;
            let mut last_source = None;

            for _ in 0..self.config.probes_per_hop {
                if !first_probe {
                    thread::sleep(self.config.pause);
                }
                first_probe = false;

                let packet = EchoRequest::build(self.listener.identifier(), self.config.payload_size);
                self.transport.send_to(&packet, self.target, Some(ttl))?;

                let observation = self.listener.receive(&mut self.transport, self.config.timeout)?;
                debug!(ttl, ?observation, "probe finished");

                match observation {
                    Observation::Reply { source, rtt, .. } | Observation::Exceeded { source, rtt } => {
                        if last_source != Some(source) {
                            write!(out, " {}", display_name(source, self.config.numeric))?;
                            last_source = Some(source);
                        }
                        write!(out, "  {} ms", format_rtt(rtt))?;
                    }
                    Observation::TimedOut => {
                        record.record_timeout(ttl);
                        write!(out, " *")?;
                    }
                }

                if observation.reached_destination() {
                    destination_reached = true;
                    writeln!(out)?;
                    break 'hops;
                }
            }
            writeln!(out)?;
        }

        if !destination_reached {
            writeln!(out, "Destination {} not reached within {} hops", self.target, self.config.max_hops)?;
        }
        if self.config.summary {
            write_unanswered(out, &record, self.config.probes_per_hop)?;
        }

        Ok(TraceOutcome { destination_reached, hops, record })
    }
}

pub fn write_unanswered<W: Write>(out: &mut W, record: &HopRecord, probes_per_hop: u8) -> Result<(), ProbeError> {
    if record.is_empty() {
        writeln!(out, "All probes were answered.")?;
        return Ok(());
    }
    writeln!(out, "Unanswered probes per hop:")?;
    for (ttl, count) in record.iter() {
        writeln!(out, "{:2}  {} of {}", ttl, count, probes_per_hop)?;
    }
    Ok(())
}

/// Full traceroute run against `host`: open the socket, resolve, trace.
pub fn traceroute<W: Write>(host: &str, config: &TraceConfig, out: &mut W) -> Result<TraceOutcome, ProbeError> {
    config.validate()?;

    let transport = RawIcmpTransport::open()?;
    let target = resolve_host(host)?;
    let icmp_identifier = new_identifier();
    info!(%host, %target, icmp_identifier, max_hops = config.max_hops, "starting traceroute");

    writeln!(
        out,
        "traceroute to {} ({}), {} hops max, {} byte packets",
        host,
        target,
        config.max_hops,
        ICMP_HEADER_LEN + config.payload_size
    )?;
    let mut tracer = Tracer::new(transport, target, icmp_identifier, config.clone());
    tracer.run(out)
}
