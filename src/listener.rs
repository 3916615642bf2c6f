use crate::error::ProbeError;
use crate::messages::Observation;
use crate::parser::{self, Verdict};
use crate::transport::IcmpTransport;

use std::time::{Duration, Instant};
use tracing::trace;

/// Waits for the reply to one probe of a run.
#[derive(Debug, Clone, Copy)]
pub struct PacketListener {
    icmp_identifier: u16,
}

impl PacketListener {
    pub fn new(icmp_identifier: u16) -> PacketListener {
        PacketListener { icmp_identifier }
    }

    pub fn identifier(&self) -> u16 {
        self.icmp_identifier
    }

    /// Blocks until a reply for this run arrives or `timeout` has elapsed
    /// since the call. Unrelated traffic never extends the wait.
    pub fn receive<T: IcmpTransport + ?Sized>(
        &self,
        transport: &mut T,
        timeout: Duration,
    ) -> Result<Observation, ProbeError> {
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Observation::TimedOut);
            }

            let Some(inbound) = transport.recv_timeout(remaining)? else {
                continue;
            };

            match parser::parse(&inbound.message, self.icmp_identifier) {
                Verdict::EchoReply { bytes } => {
                    return Ok(Observation::Reply {
                        source: inbound.source,
                        rtt: started.elapsed(),
                        bytes,
                        reached_destination: true,
                    });
                }
                Verdict::TimeExceeded => {
                    return Ok(Observation::Exceeded { source: inbound.source, rtt: started.elapsed() });
                }
                Verdict::Ignored(reason) => {
                    trace!(source = %inbound.source, ?reason, "ignoring ICMP message");
                }
            }
        }
    }
}
