//! FTP transactions: login, a passive or active data connection, then a
//! download (`SIZE` + `RETR`) or an upload (`STOR`) whose byte count is
//! checked against the expected size.

pub mod reply;


use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use http::Method;
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::config::RunSettings;
use crate::error::{ProtocolError, TransactionError, TransportError};
use crate::http::Outcome;
use crate::transport::{
    Connection, ConnectionKey, Dialer, FtpState, KeepAlive, ProtocolState, Socket,
};
use crate::urls::UrlEntry;

use reply::{Reply, expect, parse_passive, port_argument, read_reply};

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "volley@";

/// Data connection prepared before the transfer command is sent.
enum DataChannel {
    Passive(Socket),
    Active(TcpListener),
}

impl DataChannel {
    async fn establish(self, dialer: &Dialer) -> Result<Socket, TransportError> {
        match self {
            DataChannel::Passive(socket) => Ok(socket),
            DataChannel::Active(listener) => dialer.accept(&listener).await,
        }
    }
}

struct Transfer {
    code: u16,
    bytes: u64,
    command: &'static str,
}

/// Drives FTP transactions for one simulated user.
pub struct FtpRunner {
    settings: Arc<RunSettings>,
    dialer: Dialer,
}

impl FtpRunner {
    #[must_use]
    pub const fn new(settings: Arc<RunSettings>, dialer: Dialer) -> Self {
        Self { settings, dialer }
    }

    /// Runs one transfer. Like the HTTP runner it never fails outright.
    pub async fn run(&mut self, conn: &mut Connection, entry: &UrlEntry) -> Outcome {
        let started = Instant::now();
        let mut outcome = Outcome::default();
        match self.transfer(conn, entry).await {
            Ok(transfer) => {
                tracing::debug!(
                    "FTP {} {:.2} secs: {} bytes ==> {} {}",
                    transfer.code,
                    started.elapsed().as_secs_f64(),
                    transfer.bytes,
                    transfer.command,
                    entry.url.path()
                );
                outcome.status = Some(transfer.code);
                outcome.bytes = transfer.bytes;
            }
            Err(err) => {
                conn.force_close().await;
                if let TransactionError::Protocol(ProtocolError::FtpReply { code, .. }) = &err {
                    outcome.status = Some(*code);
                }
                outcome.error = Some(err);
            }
        }
        outcome.elapsed = started.elapsed();
        outcome
    }

    async fn transfer(
        &mut self,
        conn: &mut Connection,
        entry: &UrlEntry,
    ) -> Result<Transfer, TransactionError> {
        let host = entry
            .host()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ProtocolError::MissingHost {
                url: entry.url.to_string(),
            })?
            .to_owned();
        let port = entry.port();
        let user = match entry.url.username() {
            "" => ANONYMOUS_USER,
            name => name,
        };
        let password = entry.url.password().unwrap_or(ANONYMOUS_PASSWORD);
        let key = ConnectionKey {
            tls: false,
            host: host.clone(),
            port,
        };

        let logged_in = matches!(
            conn.state(),
            ProtocolState::Ftp(FtpState { user: current, logged_in: true }) if current == user
        );
        let reuse = self.settings.keep_alive && logged_in && conn.can_reuse(&key);
        if !reuse {
            let socket = self.dialer.connect(&host, port).await?;
            conn.attach(socket, key, ProtocolState::Ftp(FtpState::default()))
                .await;
        }

        let control = conn.begin().ok_or(TransportError::Closed)?;
        if !reuse {
            login(control, user, password).await?;
            expect("TYPE", command(control, "TYPE I").await?, &[200])?;
        }

        let path = entry.url.path();
        let upload = matches!(entry.method, Method::PUT | Method::POST);
        let payload = entry.body.as_deref().unwrap_or_default();
        let expected = if upload {
            Some(u64::try_from(payload.len()).unwrap_or(u64::MAX))
        } else {
            remote_size(control, path).await?
        };

        let channel = self.open_data(control).await?;
        let verb = if upload { "STOR" } else { "RETR" };
        expect(verb, command(control, &format!("{} {}", verb, path)).await?, &[125, 150])?;
        let mut data = channel.establish(&self.dialer).await?;
        let moved = if upload {
            data.write_all(payload).await.map(|()| expected.unwrap_or_default())
        } else {
            data.read_to_close(None).await
        };
        data.close().await;
        let transferred = moved?;
        let done = expect(verb, read_reply(control).await?, &[226, 250])?;

        if let Some(expected) = expected
            && expected != transferred
        {
            return Err(ProtocolError::FtpSizeMismatch {
                expected,
                transferred,
            }
            .into());
        }

        let keep = self.settings.keep_alive;
        if !keep && let Ok(bye) = command(control, "QUIT").await {
            tracing::trace!("QUIT answered {}", bye.code);
        }
        if let ProtocolState::Ftp(state) = conn.state_mut() {
            state.user = user.to_owned();
            state.logged_in = true;
        }
        conn.finish(if keep {
            KeepAlive {
                reusable: true,
                max_uses: None,
                timeout: None,
            }
        } else {
            KeepAlive::close()
        });
        conn.release().await;

        Ok(Transfer {
            code: done.code,
            bytes: transferred,
            command: verb,
        })
    }

    /// Negotiates the data connection the configured way.
    async fn open_data(&self, control: &mut Socket) -> Result<DataChannel, TransactionError> {
        if self.settings.ftp_passive {
            let reply = expect("PASV", command(control, "PASV").await?, &[227])?;
            let addr = parse_passive(&reply.text)?;
            let ip = if addr.ip().is_unspecified() {
                control.peer_addr().ip()
            } else {
                IpAddr::V4(*addr.ip())
            };
            let socket = self.dialer.connect(&ip.to_string(), addr.port()).await?;
            return Ok(DataChannel::Passive(socket));
        }

        let local = match control.local_addr() {
            SocketAddr::V4(local) => local,
            SocketAddr::V6(local) => {
                return Err(ProtocolError::ActiveModeAddress {
                    addr: local.to_string(),
                }
                .into());
            }
        };
        let listener = self.dialer.listen(IpAddr::V4(*local.ip())).await?;
        let bound = listener.local_addr().map_err(|err| TransportError::Io {
            op: "listen",
            source: err,
        })?;
        let mut advertised = local;
        advertised.set_port(bound.port());
        let line = format!("PORT {}", port_argument(advertised));
        expect("PORT", command(control, &line).await?, &[200])?;
        Ok(DataChannel::Active(listener))
    }
}

async fn command(control: &mut Socket, line: &str) -> Result<Reply, TransactionError> {
    let mut bytes = Vec::with_capacity(line.len().saturating_add(2));
    bytes.extend_from_slice(line.as_bytes());
    bytes.extend_from_slice(b"\r\n");
    control.write_all(&bytes).await?;
    read_reply(control).await
}

async fn login(control: &mut Socket, user: &str, password: &str) -> Result<(), TransactionError> {
    expect("CONNECT", read_reply(control).await?, &[220])?;
    let reply = expect(
        "USER",
        command(control, &format!("USER {}", user)).await?,
        &[230, 331],
    )?;
    if reply.code == 331 {
        expect(
            "PASS",
            command(control, &format!("PASS {}", password)).await?,
            &[202, 230],
        )?;
    }
    Ok(())
}

/// `SIZE` of a remote file; servers that do not implement it yield `None`.
async fn remote_size(control: &mut Socket, path: &str) -> Result<Option<u64>, TransactionError> {
    let reply = command(control, &format!("SIZE {}", path)).await?;
    if reply.code != 213 {
        return Ok(None);
    }
    Ok(reply.text.trim().parse::<u64>().ok())
}
