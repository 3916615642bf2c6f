use crate::error::ProbeError;

use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Resolves the probe destination to an IPv4 address.
///
/// Dotted-quad input is used as is; names go through the system resolver
/// and the first IPv4 answer wins.
pub fn resolve_host(host: &str) -> Result<Ipv4Addr, ProbeError> {
    if let Ok(address) = host.parse::<Ipv4Addr>() {
        return Ok(address);
    }

    let addresses = dns_lookup::lookup_host(host).map_err(|source| ProbeError::ResolutionFailed {
        host: host.to_string(),
        source: Some(source),
    })?;

    addresses
        .into_iter()
        .find_map(|address| match address {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ProbeError::ResolutionFailed { host: host.to_string(), source: None })
}

pub fn reverse_lookup(address: Ipv4Addr) -> Result<String, ProbeError> {
    dns_lookup::lookup_addr(&IpAddr::V4(address))
        .map_err(|source| ProbeError::ReverseResolutionFailed { address, source })
}

/// How a hop is printed: `name (a.b.c.d)` when a name is known, else the
/// bare address.
pub fn display_name(address: Ipv4Addr, numeric: bool) -> String {
    if numeric {
        return address.to_string();
    }

    match reverse_lookup(address) {
        Ok(hostname) if !hostname.is_empty() && hostname != address.to_string() => {
            format!("{} ({})", hostname, address)
        }
        Ok(_) => address.to_string(),
        Err(e) => {
            debug!(%address, error = %e, "falling back to numeric hop address");
            address.to_string()
        }
    }
}
