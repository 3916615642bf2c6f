use std::io;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Errors raised while running a probe.
///
/// `PermissionDenied`, `ResolutionFailed` and the socket variants abort the
/// run. `ReverseResolutionFailed` is always recovered by falling back to the
/// numeric address.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("raw ICMP sockets need elevated privileges (run as root or grant CAP_NET_RAW)")]
    PermissionDenied(#[source] io::Error),

    #[error("failed to resolve host {host}")]
    ResolutionFailed {
        host: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("reverse lookup of {address} failed")]
    ReverseResolutionFailed {
        address: Ipv4Addr,
        #[source]
        source: io::Error,
    },

    #[error("failed to open raw ICMP socket: {0}")]
    SocketCreation(#[source] io::Error),

    #[error("failed to send probe to {destination}: {source}")]
    SendFailed {
        destination: Ipv4Addr,
        #[source]
        source: io::Error,
    },

    #[error("failed to receive from raw socket: {0}")]
    ReceiveFailed(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProbeError {
    /// Process exit status for this error (sysexits values where one fits).
    pub fn exit_code(&self) -> u8 {
        match self {
            ProbeError::PermissionDenied(_) => 77,
            ProbeError::ResolutionFailed { .. } => 68,
            ProbeError::InvalidConfig(_) => 64,
            _ => 1,
        }
    }

    pub(crate) fn from_socket_open(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied(error),
            _ => ProbeError::SocketCreation(error),
        }
    }
}
