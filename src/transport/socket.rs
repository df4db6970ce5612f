use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

use super::stream::Stream;

/// Default receive buffer size for a socket.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16 * 1024;
/// Orderly TLS shutdown may need several close_notify round trips.
const TLS_SHUTDOWN_ATTEMPTS: usize = 3;
/// Upper bound for each shutdown attempt.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// A connected byte stream with a private receive buffer.
///
/// `head..tail` of `buffer` holds bytes received from the OS but not yet
/// handed to a caller. The cursors only move after an OS read completes, so a
/// cancelled read leaves the buffer consistent.
pub struct Socket {
    stream: Option<Stream>,
    buffer: Vec<u8>,
    head: usize,
    tail: usize,
    io_timeout: Duration,
    cancel: CancellationToken,
    peer: SocketAddr,
    local: SocketAddr,
}

impl Socket {
    pub(super) fn new(
        stream: Stream,
        capacity: usize,
        io_timeout: Duration,
        cancel: CancellationToken,
        peer: SocketAddr,
        local: SocketAddr,
    ) -> Self {
        Self {
            stream: Some(stream),
            buffer: vec![0u8; capacity.max(1)],
            head: 0,
            tail: 0,
            io_timeout,
            cancel,
            peer,
            local,
        }
    }

    pub(super) fn take_stream(&mut self) -> Option<Stream> {
        self.stream.take()
    }

    pub(super) fn replace_stream(&mut self, stream: Stream) {
        self.stream = Some(stream);
        self.head = 0;
        self.tail = 0;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.stream.as_ref().is_some_and(Stream::is_tls)
    }

    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Bytes already received and waiting in the buffer.
    #[must_use]
    pub const fn buffered(&self) -> usize {
        self.tail.saturating_sub(self.head)
    }

    /// An idle socket is stale when the peer has hung up or sent bytes
    /// nobody asked for; either way it must not carry another request.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        match self.stream.as_ref() {
            Some(stream) => self.buffered() > 0 || stream.is_stale(),
            None => true,
        }
    }

    /// Refills the receive buffer. Only called once the buffer is drained.
    async fn fill(&mut self) -> Result<usize, TransportError> {
        self.head = 0;
        self.tail = 0;
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let spare = self.buffer.as_mut_slice();
        let result = tokio::select! {
            () = self.cancel.cancelled() => return Err(TransportError::Cancelled),
            result = timeout(self.io_timeout, stream.read(spare)) => result,
        };
        let read = match result {
            Ok(Ok(read)) => read,
            Ok(Err(err)) => return Err(TransportError::Io { op: "read", source: err }),
            Err(_) => {
                return Err(TransportError::Timeout {
                    op: "read",
                    timeout: self.io_timeout,
                });
            }
        };
        self.tail = read.min(self.buffer.len());
        Ok(self.tail)
    }

    /// Moves up to `n` buffered-or-received bytes into `out` (or drops them
    /// when `out` is `None`). A short count means the peer closed the stream.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, cancellation, or an OS read failure.
    pub async fn read_into(
        &mut self,
        mut out: Option<&mut Vec<u8>>,
        n: u64,
    ) -> Result<u64, TransportError> {
        let mut copied: u64 = 0;
        while copied < n {
            if self.buffered() == 0 && self.fill().await? == 0 {
                break;
            }
            let remaining = usize::try_from(n.saturating_sub(copied)).unwrap_or(usize::MAX);
            let take = remaining.min(self.buffered());
            let end = self.head.saturating_add(take);
            if let (Some(sink), Some(bytes)) = (out.as_deref_mut(), self.buffer.get(self.head..end)) {
                sink.extend_from_slice(bytes);
            }
            self.head = end;
            copied = copied.saturating_add(u64::try_from(take).unwrap_or(u64::MAX));
        }
        Ok(copied)
    }

    /// Reads up to `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, cancellation, or an OS read failure.
    pub async fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let mut out = Vec::with_capacity(n.min(self.buffer.len()));
        self.read_into(Some(&mut out), u64::try_from(n).unwrap_or(u64::MAX))
            .await?;
        Ok(out)
    }

    /// Reads until the peer closes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, cancellation, or an OS read failure.
    pub async fn read_to_close(
        &mut self,
        mut out: Option<&mut Vec<u8>>,
    ) -> Result<u64, TransportError> {
        let mut total: u64 = 0;
        loop {
            if self.buffered() == 0 && self.fill().await? == 0 {
                return Ok(total);
            }
            let available = self.buffered();
            let end = self.head.saturating_add(available);
            if let (Some(sink), Some(bytes)) = (out.as_deref_mut(), self.buffer.get(self.head..end)) {
                sink.extend_from_slice(bytes);
            }
            self.head = end;
            total = total.saturating_add(u64::try_from(available).unwrap_or(u64::MAX));
        }
    }

    /// Reads one line, without its CR/LF terminator, stopping after
    /// `max_len` bytes. Returns `None` when the peer closed before sending
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, cancellation, or an OS read failure.
    pub async fn read_line(&mut self, max_len: usize) -> Result<Option<String>, TransportError> {
        let mut line = Vec::new();
        let mut saw_any = false;
        while line.len() < max_len {
            if self.buffered() == 0 && self.fill().await? == 0 {
                break;
            }
            let Some(&byte) = self.buffer.get(self.head) else {
                break;
            };
            self.head = self.head.saturating_add(1);
            saw_any = true;
            if byte == b'\n' {
                break;
            }
            line.push(byte);
        }
        if !saw_any {
            return Ok(None);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Writes every byte of `buf`, retrying interrupted writes.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, cancellation, or a fatal OS write failure.
    pub async fn write_all(&mut self, mut buf: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        while !buf.is_empty() {
            let result = tokio::select! {
                () = self.cancel.cancelled() => return Err(TransportError::Cancelled),
                result = timeout(self.io_timeout, stream.write(buf)) => result,
            };
            match result {
                Ok(Ok(0)) => {
                    return Err(TransportError::Io {
                        op: "write",
                        source: io::Error::from(io::ErrorKind::WriteZero),
                    });
                }
                Ok(Ok(written)) => buf = buf.get(written..).unwrap_or_default(),
                Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => {}
                Ok(Err(err)) => return Err(TransportError::Io { op: "write", source: err }),
                Err(_) => {
                    return Err(TransportError::Timeout {
                        op: "write",
                        timeout: self.io_timeout,
                    });
                }
            }
        }
        let flushed = tokio::select! {
            () = self.cancel.cancelled() => return Err(TransportError::Cancelled),
            result = timeout(self.io_timeout, stream.flush()) => result,
        };
        match flushed {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(TransportError::Io { op: "flush", source: err }),
            Err(_) => Err(TransportError::Timeout {
                op: "flush",
                timeout: self.io_timeout,
            }),
        }
    }

    /// Shuts the stream down and releases it. Calling it again is a no-op.
    pub async fn close(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        let attempts = if stream.is_tls() {
            TLS_SHUTDOWN_ATTEMPTS
        } else {
            1
        };
        for _ in 0..attempts {
            match timeout(SHUTDOWN_TIMEOUT, stream.shutdown()).await {
                Ok(Ok(())) => break,
                Ok(Err(err))
                    if matches!(
                        err.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) => {}
                Ok(Err(_)) | Err(_) => break,
            }
        }
        self.head = 0;
        self.tail = 0;
    }
}
