use std::net::Ipv4Addr;
use std::time::Duration;

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Echo reply carrying our identifier.
    Reply {
        source: Ipv4Addr,
        rtt: Duration,
        bytes: usize,
        reached_destination: bool,
    },
    /// Time exceeded from an intermediate router.
    Exceeded { source: Ipv4Addr, rtt: Duration },
    TimedOut,
}

impl Observation {
    pub fn reached_destination(&self) -> bool {
        matches!(self, Observation::Reply { reached_destination: true, .. })
    }
}

/// Milliseconds with two decimals, e.g. `12.34`.
pub fn format_rtt(rtt: Duration) -> String {
    format!("{:.2}", rtt.as_secs_f64() * 1000.0)
}
