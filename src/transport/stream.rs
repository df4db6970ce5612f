use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;

/// Plaintext or TLS byte stream underneath a [`super::Socket`].
pub(super) enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    pub(super) async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(stream) => stream.read(buf).await,
            Stream::Tls(stream) => stream.read(buf).await,
        }
    }

    pub(super) async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(stream) => stream.write(buf).await,
            Stream::Tls(stream) => stream.write(buf).await,
        }
    }

    pub(super) async fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(stream) => stream.flush().await,
            Stream::Tls(stream) => stream.flush().await,
        }
    }

    pub(super) async fn shutdown(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(stream) => stream.shutdown().await,
            Stream::Tls(stream) => stream.shutdown().await,
        }
    }

    pub(super) const fn is_tls(&self) -> bool {
        matches!(self, Stream::Tls(_))
    }

    /// Returns true when the peer has closed or left unread bytes on an idle
    /// plaintext stream. TLS streams cannot be probed without consuming
    /// records, so they are assumed live.
    pub(super) fn is_stale(&self) -> bool {
        match self {
            Stream::Plain(stream) => {
                let mut probe = [0u8; 1];
                match stream.try_read(&mut probe) {
                    Ok(_) => true,
                    Err(err) => err.kind() != io::ErrorKind::WouldBlock,
                }
            }
            Stream::Tls(_) => false,
        }
    }
}
