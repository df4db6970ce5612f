use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("No addresses resolved for {host}.")]
    NoAddresses { host: String },
    #[error("Connection to {host}:{port} timed out after {}ms.", .timeout.as_millis())]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },
    #[error("Failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },
    #[error("No TLS connector is configured for {host}.")]
    TlsUnavailable { host: String },
    #[error("TLS handshake with {host} timed out.")]
    TlsTimeout { host: String },
    #[error("Socket {op} timed out after {}ms.", .timeout.as_millis())]
    Timeout { op: &'static str, timeout: Duration },
    #[error("Socket {op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Socket operation cancelled.")]
    Cancelled,
    #[error("Socket is closed.")]
    Closed,
}

impl TransportError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}
