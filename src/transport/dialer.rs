use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, lookup_host};
use tokio::time::timeout;
use tokio_native_tls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{TransportError, ValidationError};

use super::socket::{DEFAULT_BUFFER_CAPACITY, Socket};
use super::stream::Stream;

/// Timeouts and buffer sizing applied to every socket a [`Dialer`] opens.
#[derive(Debug, Clone, Copy)]
pub struct SocketOptions {
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
    pub tls_timeout: Duration,
    pub buffer_capacity: usize,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(30),
            tls_timeout: Duration::from_secs(30),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Builds the TLS connector shared by every simulated user.
///
/// # Errors
///
/// Returns an error when the platform TLS backend cannot be initialised.
pub fn build_tls_connector(insecure: bool) -> Result<TlsConnector, ValidationError> {
    let mut builder = native_tls::TlsConnector::builder();
    if insecure {
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }
    builder
        .build()
        .map(TlsConnector::from)
        .map_err(|err| ValidationError::TlsConnector { source: err })
}

/// Opens sockets on behalf of one simulated user.
#[derive(Clone)]
pub struct Dialer {
    options: SocketOptions,
    tls: Option<Arc<TlsConnector>>,
    cancel: CancellationToken,
}

impl Dialer {
    #[must_use]
    pub const fn new(
        options: SocketOptions,
        tls: Option<Arc<TlsConnector>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            options,
            tls,
            cancel,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &SocketOptions {
        &self.options
    }

    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves `host` and connects to the first address that accepts,
    /// all within one connect deadline. There is no retry after the deadline.
    ///
    /// # Errors
    ///
    /// Returns an error on resolution failure, refusal, timeout, or
    /// cancellation.
    pub async fn connect(&self, host: &str, port: u16) -> Result<Socket, TransportError> {
        let attempt = async {
            let addrs: Vec<SocketAddr> = lookup_host((host, port))
                .await
                .map_err(|err| TransportError::Resolve {
                    host: host.to_owned(),
                    port,
                    source: err,
                })?
                .collect();
            if addrs.is_empty() {
                return Err(TransportError::NoAddresses {
                    host: host.to_owned(),
                });
            }
            let mut last_error = None;
            for addr in addrs {
                match TcpStream::connect(addr).await {
                    Ok(stream) => return Ok(stream),
                    Err(err) => {
                        debug!("connect to {} failed: {}", addr, err);
                        last_error = Some(err);
                    }
                }
            }
            Err(TransportError::Connect {
                host: host.to_owned(),
                port,
                source: last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotConnected)),
            })
        };

        let result = tokio::select! {
            () = self.cancel.cancelled() => return Err(TransportError::Cancelled),
            result = timeout(self.options.connect_timeout, attempt) => result,
        };
        let stream = match result {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(TransportError::ConnectTimeout {
                    host: host.to_owned(),
                    port,
                    timeout: self.options.connect_timeout,
                });
            }
        };
        self.wrap(stream, "connect")
    }

    /// Binds a listener for an inbound data connection (FTP active mode).
    ///
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound.
    pub async fn listen(&self, ip: IpAddr) -> Result<TcpListener, TransportError> {
        TcpListener::bind(SocketAddr::new(ip, 0))
            .await
            .map_err(|err| TransportError::Io {
                op: "listen",
                source: err,
            })
    }

    /// Waits for the peer to connect back to `listener`, bounded by the
    /// connect deadline.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, cancellation, or an accept failure.
    pub async fn accept(&self, listener: &TcpListener) -> Result<Socket, TransportError> {
        let result = tokio::select! {
            () = self.cancel.cancelled() => return Err(TransportError::Cancelled),
            result = timeout(self.options.connect_timeout, listener.accept()) => result,
        };
        match result {
            Ok(Ok((stream, _))) => self.wrap(stream, "accept"),
            Ok(Err(err)) => Err(TransportError::Io {
                op: "accept",
                source: err,
            }),
            Err(_) => Err(TransportError::Timeout {
                op: "accept",
                timeout: self.options.connect_timeout,
            }),
        }
    }

    fn wrap(&self, stream: TcpStream, op: &'static str) -> Result<Socket, TransportError> {
        if let Err(err) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", err);
        }
        let peer = stream
            .peer_addr()
            .map_err(|err| TransportError::Io { op, source: err })?;
        let local = stream
            .local_addr()
            .map_err(|err| TransportError::Io { op, source: err })?;

        Ok(Socket::new(
            Stream::Plain(stream),
            self.options.buffer_capacity,
            self.options.io_timeout,
            self.cancel.clone(),
            peer,
            local,
        ))
    }

    /// Connects and immediately negotiates TLS for `host`.
    ///
    /// # Errors
    ///
    /// Returns an error when the TCP connect or the TLS handshake fails.
    pub async fn connect_tls(&self, host: &str, port: u16) -> Result<Socket, TransportError> {
        let socket = self.connect(host, port).await?;
        self.upgrade(socket, host).await
    }

    /// Negotiates TLS over an already connected plaintext socket, e.g. a
    /// proxy tunnel.
    ///
    /// # Errors
    ///
    /// Returns an error when no TLS connector is configured, the socket is
    /// closed, or the handshake fails or times out.
    pub async fn upgrade(&self, mut socket: Socket, domain: &str) -> Result<Socket, TransportError> {
        let connector = self
            .tls
            .as_ref()
            .ok_or_else(|| TransportError::TlsUnavailable {
                host: domain.to_owned(),
            })?;
        let tcp = match socket.take_stream() {
            Some(Stream::Plain(tcp)) => tcp,
            Some(other) => {
                socket.replace_stream(other);
                return Ok(socket);
            }
            None => return Err(TransportError::Closed),
        };
        let handshake = tokio::select! {
            () = self.cancel.cancelled() => return Err(TransportError::Cancelled),
            result = timeout(self.options.tls_timeout, connector.connect(domain, tcp)) => result,
        };
        let tls = match handshake {
            Ok(Ok(tls)) => tls,
            Ok(Err(err)) => {
                return Err(TransportError::Tls {
                    host: domain.to_owned(),
                    source: err,
                });
            }
            Err(_) => {
                return Err(TransportError::TlsTimeout {
                    host: domain.to_owned(),
                });
            }
        };
        socket.replace_stream(Stream::Tls(Box::new(tls)));
        Ok(socket)
    }
}
