//! Deadline-bounded TCP/TLS transport with connection reuse bookkeeping.
//!
//! Every socket operation races the run's cancellation token, so a stopped run
//! never waits on an unresponsive server for longer than one poll.
mod connection;
mod dialer;
mod socket;
mod stream;

#[cfg(test)]
mod tests;

pub use connection::{
    Connection, ConnectionKey, FtpState, HttpState, KeepAlive, ProtocolState, TransferMode,
};
pub use dialer::{Dialer, SocketOptions, build_tls_connector};
pub use socket::{DEFAULT_BUFFER_CAPACITY, Socket};
