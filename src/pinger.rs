use crate::dns_resolver::resolve_host;
use crate::error::ProbeError;
use crate::listener::PacketListener;
use crate::messages::{Observation, format_rtt};
use crate::packet::{DEFAULT_PAYLOAD_SIZE, EchoRequest, MAX_PAYLOAD_SIZE, new_identifier};
use crate::transport::{IcmpTransport, RawIcmpTransport};

use std::io::Write;
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct PingConfig {
    pub count: u32,
    pub interval: Duration,
    pub payload_size: usize,
    pub timeout: Duration,
}

impl Default for PingConfig {
    fn default() -> Self {
        PingConfig {
            count: 4,
            interval: Duration::from_secs(1),
            payload_size: DEFAULT_PAYLOAD_SIZE,
            timeout: Duration::from_secs(1),
        }
    }
}

impl PingConfig {
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.count == 0 {
            return Err(ProbeError::InvalidConfig("count must be at least 1".to_string()));
        }
        if self.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ProbeError::InvalidConfig(format!(
                "payload size {} exceeds {} bytes",
                self.payload_size, MAX_PAYLOAD_SIZE
            )));
        }
        Ok(())
    }
}

/// Tally of one ping run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingSummary {
    pub transmitted: u32,
    pub replies: u32,
    pub exceeded: u32,
    pub timeouts: u32,
    pub rtt_min: Option<Duration>,
    pub rtt_max: Option<Duration>,
    rtt_total: Duration,
}

impl PingSummary {
    fn record(&mut self, observation: &Observation) {
        match observation {
            Observation::Reply { rtt, .. } => {
                self.replies += 1;
                self.rtt_total += *rtt;
                self.rtt_min = Some(self.rtt_min.map_or(*rtt, |min| min.min(*rtt)));
                self.rtt_max = Some(self.rtt_max.map_or(*rtt, |max| max.max(*rtt)));
            }
            Observation::Exceeded { .. } => self.exceeded += 1,
            Observation::TimedOut => self.timeouts += 1,
        }
    }

    pub fn rtt_avg(&self) -> Option<Duration> {
        (self.replies > 0).then(|| self.rtt_total / self.replies)
    }
}

/// Fixed-count echo loop over an owned transport.
pub struct Pinger<T: IcmpTransport> {
    transport: T,
    destination: Ipv4Addr,
    listener: PacketListener,
    config: PingConfig,
}

impl<T: IcmpTransport> Pinger<T> {
    pub fn new(transport: T, destination: Ipv4Addr, icmp_identifier: u16, config: PingConfig) -> Pinger<T> {
        Pinger { transport, destination, listener: PacketListener::new(icmp_identifier), config }
    }

    /// Sends exactly `count` probes, reporting each send and its outcome, pausing
    /// `interval` between probes but not after the last one.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<PingSummary, ProbeError> {
        let mut summary = PingSummary::default();

        for seq in 1..=self.config.count {
            let packet = EchoRequest::build(self.listener.identifier(), self.config.payload_size);
            self.transport.send_to(&packet, self.destination, None)?;
            summary.transmitted += 1;
            debug!(seq, destination = %self.destination, "echo request sent");
            writeln!(out, "Sent packet {}", seq)?;

            let observation = self.listener.receive(&mut self.transport, self.config.timeout)?;
            match &observation {
                Observation::Reply { source, rtt, bytes, .. } => {
                    writeln!(out, "Reply from {}: bytes={} seq={} time={}ms", source, bytes, seq, format_rtt(*rtt))?;
                }
                Observation::Exceeded { source, rtt } => {
                    writeln!(out, "From {}: time to live exceeded seq={} time={}ms", source, seq, format_rtt(*rtt))?;
                }
                Observation::TimedOut => {
                    writeln!(out, "Request timeout for packet {}", seq)?;
                }
            }
            summary.record(&observation);

            if seq < self.config.count {
                thread::sleep(self.config.interval);
            }
        }

        Ok(summary)
    }
}

/// Full ping run against `host`: open the socket, resolve, probe, report.
pub fn ping<W: Write>(host: &str, config: &PingConfig, out: &mut W) -> Result<PingSummary, ProbeError> {
    config.validate()?;

    let transport = RawIcmpTransport::open()?;
    let destination = resolve_host(host)?;
    let icmp_identifier = new_identifier();
    info!(%host, %destination, icmp_identifier, "starting ping");

    writeln!(out, "PING {} ({}): {} packets of {} bytes", host, destination, config.count, config.payload_size)?;
    let mut pinger = Pinger::new(transport, destination, icmp_identifier, config.clone());
    let summary = pinger.run(out)?;
    write_summary(out, host, &summary)?;
    Ok(summary)
}

pub fn write_summary<W: Write>(out: &mut W, host: &str, summary: &PingSummary) -> Result<(), ProbeError> {
    writeln!(out, "Ping to {} completed.", host)?;
    writeln!(out, "--- {} ping statistics ---", host)?;
    writeln!(out, "{} packets transmitted, {} replies received", summary.transmitted, summary.replies)?;
    if let (Some(min), Some(avg), Some(max)) = (summary.rtt_min, summary.rtt_avg(), summary.rtt_max) {
        writeln!(out, "rtt min/avg/max = {}/{}/{} ms", format_rtt(min), format_rtt(avg), format_rtt(max))?;
    }
    Ok(())
}
