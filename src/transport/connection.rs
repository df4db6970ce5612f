use std::time::Duration;

use tokio::time::Instant;

use super::socket::Socket;

/// Identity of the far end a connection may be reused for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionKey {
    pub tls: bool,
    pub host: String,
    pub port: u16,
}

/// How the body of the current response is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    None,
    Length(u64),
    Chunked,
    UntilClose,
}

/// Server-advertised persistence for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub reusable: bool,
    pub max_uses: Option<u32>,
    pub timeout: Option<Duration>,
}

impl KeepAlive {
    #[must_use]
    pub const fn close() -> Self {
        Self {
            reusable: false,
            max_uses: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct HttpState {
    pub transfer: TransferMode,
    pub via_proxy: bool,
}

/// Control-channel session. `user` is who logged in, so a reused control
/// connection is only handed to requests for the same account.
#[derive(Debug, Default)]
pub struct FtpState {
    pub user: String,
    pub logged_in: bool,
}

/// Protocol-specific view of the same transport.
#[derive(Debug, Default)]
pub enum ProtocolState {
    #[default]
    Idle,
    Http(HttpState),
    Ftp(FtpState),
}

/// One simulated user's transport, reused across transactions while the
/// server allows it.
#[derive(Default)]
pub struct Connection {
    socket: Option<Socket>,
    key: Option<ConnectionKey>,
    keep_alive: Option<KeepAlive>,
    uses: u32,
    last_used: Option<Instant>,
    in_flight: bool,
    state: ProtocolState,
}

impl Connection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    #[must_use]
    pub const fn uses(&self) -> u32 {
        self.uses
    }

    #[must_use]
    pub const fn state(&self) -> &ProtocolState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut ProtocolState {
        &mut self.state
    }

    /// Whether the open socket can carry the next transaction to `key`.
    #[must_use]
    pub fn can_reuse(&self, key: &ConnectionKey) -> bool {
        let Some(socket) = self.socket.as_ref() else {
            return false;
        };
        if self.in_flight || self.key.as_ref() != Some(key) {
            return false;
        }
        let Some(keep_alive) = self.keep_alive else {
            return false;
        };
        if !keep_alive.reusable || !self.within_budget(keep_alive) {
            return false;
        }
        if let (Some(limit), Some(last_used)) = (keep_alive.timeout, self.last_used)
            && last_used.elapsed() >= limit
        {
            return false;
        }
        !socket.is_stale()
    }

    /// Installs a freshly opened socket, closing whatever was there.
    pub async fn attach(&mut self, socket: Socket, key: ConnectionKey, state: ProtocolState) {
        self.force_close().await;
        self.socket = Some(socket);
        self.key = Some(key);
        self.state = state;
        self.uses = 0;
        self.keep_alive = None;
    }

    /// Marks the start of a transaction and hands out the socket.
    pub fn begin(&mut self) -> Option<&mut Socket> {
        self.in_flight = true;
        self.socket.as_mut()
    }

    /// Records a completed exchange and the persistence the server offered.
    pub fn finish(&mut self, keep_alive: KeepAlive) {
        self.in_flight = false;
        self.uses = self.uses.saturating_add(1);
        self.last_used = Some(Instant::now());
        // Keep-Alive `max` counts the remaining requests from now on.
        self.keep_alive = Some(KeepAlive {
            max_uses: keep_alive
                .max_uses
                .map(|remaining| self.uses.saturating_add(remaining)),
            ..keep_alive
        });
    }

    fn within_budget(&self, keep_alive: KeepAlive) -> bool {
        keep_alive.max_uses.is_none_or(|max_uses| self.uses < max_uses)
    }

    /// Closes the socket unless it may carry another transaction, including
    /// when the server's use budget is spent.
    pub async fn release(&mut self) {
        let reusable = !self.in_flight
            && self
                .keep_alive
                .is_some_and(|keep| keep.reusable && self.within_budget(keep));
        if !reusable {
            self.force_close().await;
        }
    }

    /// Closes the socket regardless of keep-alive state. Idempotent.
    pub async fn force_close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close().await;
        }
        self.key = None;
        self.keep_alive = None;
        self.in_flight = false;
        self.uses = 0;
        self.last_used = None;
        self.state = ProtocolState::Idle;
    }
}
