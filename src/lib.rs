//! Core library for the `volley` load tester.
//!
//! The binary wires these pieces together: a crew of OS threads, one
//! simulated browser per thread driving HTTP/1.1 and FTP transactions over
//! a reusable connection, shared marks and a failure gate, and the
//! siege-style aggregate. The library surface exists mainly for tests and
//! may change as the CLI grows.
pub mod args;
pub mod browser;
pub mod config;
pub mod crew;
pub mod error;
pub mod ftp;
pub mod http;
pub mod metrics;
pub mod transport;
pub mod urls;

#[cfg(test)]
mod test_support;
