use super::*;
use crate::error::TransportError;
use std::future::Future;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

/// Accepts one connection, writes each chunk with a short pause between
/// them, then closes.
fn scripted_server(chunks: Vec<Vec<u8>>) -> Result<(u16, thread::JoinHandle<Vec<u8>>), String> {
    let listener =
        TcpListener::bind("127.0.0.1:0").map_err(|err| format!("bind failed: {}", err))?;
    let port = listener
        .local_addr()
        .map_err(|err| format!("local_addr failed: {}", err))?
        .port();
    let handle = thread::spawn(move || {
        let mut received = Vec::new();
        if let Ok((mut stream, _)) = listener.accept() {
            for chunk in chunks {
                if stream.write_all(&chunk).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
            let _shutdown = stream.shutdown(std::net::Shutdown::Write);
            let _timeout = stream.set_read_timeout(Some(Duration::from_millis(200)));
            let mut buf = [0u8; 256];
            while let Ok(read) = stream.read(&mut buf) {
                if read == 0 {
                    break;
                }
                received.extend_from_slice(buf.get(..read).unwrap_or_default());
            }
        }
        received
    });
    Ok((port, handle))
}

fn dialer(buffer_capacity: usize) -> Dialer {
    let options = SocketOptions {
        connect_timeout: Duration::from_secs(2),
        io_timeout: Duration::from_secs(2),
        tls_timeout: Duration::from_secs(2),
        buffer_capacity,
    };
    Dialer::new(options, None, CancellationToken::new())
}

#[test]
fn read_line_strips_terminators() -> Result<(), String> {
    run_async_test(async {
        let (port, server) = scripted_server(vec![b"HTTP/1.1 200 OK\r\nX: y\n".to_vec()])?;
        let mut socket = dialer(64)
            .connect("127.0.0.1", port)
            .await
            .map_err(|err| format!("connect failed: {}", err))?;

        let first = socket
            .read_line(1024)
            .await
            .map_err(|err| format!("read_line failed: {}", err))?;
        if first.as_deref() != Some("HTTP/1.1 200 OK") {
            return Err(format!("Unexpected first line: {:?}", first));
        }
        let second = socket
            .read_line(1024)
            .await
            .map_err(|err| format!("read_line failed: {}", err))?;
        if second.as_deref() != Some("X: y") {
            return Err(format!("Unexpected second line: {:?}", second));
        }
        let eof = socket
            .read_line(1024)
            .await
            .map_err(|err| format!("read_line failed: {}", err))?;
        if eof.is_some() {
            return Err(format!("Expected EOF, got {:?}", eof));
        }
        socket.close().await;
        server.join().map_err(|_| "server panicked".to_owned())?;
        Ok(())
    })
}

#[test]
fn read_spans_buffer_refills() -> Result<(), String> {
    run_async_test(async {
        let payload: Vec<u8> = (0u8..=99).collect();
        let chunks = payload.chunks(7).map(<[u8]>::to_vec).collect();
        let (port, server) = scripted_server(chunks)?;
        let mut socket = dialer(4)
            .connect("127.0.0.1", port)
            .await
            .map_err(|err| format!("connect failed: {}", err))?;

        let head = socket
            .read(30)
            .await
            .map_err(|err| format!("read failed: {}", err))?;
        let mut rest = Vec::new();
        let tail = socket
            .read_into(Some(&mut rest), 1_000)
            .await
            .map_err(|err| format!("read_into failed: {}", err))?;

        if head.as_slice() != payload.get(..30).unwrap_or_default() {
            return Err("Prefix mismatch across refills".to_owned());
        }
        if tail != 70 || rest.as_slice() != payload.get(30..).unwrap_or_default() {
            return Err(format!("Expected 70 trailing bytes, got {}", tail));
        }
        socket.close().await;
        server.join().map_err(|_| "server panicked".to_owned())?;
        Ok(())
    })
}

#[test]
fn write_all_delivers_bytes_and_close_is_idempotent() -> Result<(), String> {
    run_async_test(async {
        let (port, server) = scripted_server(Vec::new())?;
        let mut socket = dialer(64)
            .connect("127.0.0.1", port)
            .await
            .map_err(|err| format!("connect failed: {}", err))?;
        socket
            .write_all(b"PING\r\n")
            .await
            .map_err(|err| format!("write failed: {}", err))?;
        socket.close().await;
        socket.close().await;
        if socket.is_open() {
            return Err("Socket still open after close".to_owned());
        }
        let received = server.join().map_err(|_| "server panicked".to_owned())?;
        if received != b"PING\r\n" {
            return Err(format!("Server saw {:?}", received));
        }
        Ok(())
    })
}

#[test]
fn connect_refused_is_reported() -> Result<(), String> {
    run_async_test(async {
        let port = {
            let listener =
                TcpListener::bind("127.0.0.1:0").map_err(|err| format!("bind failed: {}", err))?;
            listener
                .local_addr()
                .map_err(|err| format!("local_addr failed: {}", err))?
                .port()
        };
        match dialer(64).connect("127.0.0.1", port).await {
            Err(TransportError::Connect { port: failed, .. }) if failed == port => Ok(()),
            Err(other) => Err(format!("Unexpected error: {}", other)),
            Ok(_) => Err("Expected connect failure".to_owned()),
        }
    })
}

#[test]
fn cancelled_read_returns_cancelled() -> Result<(), String> {
    run_async_test(async {
        let listener =
            TcpListener::bind("127.0.0.1:0").map_err(|err| format!("bind failed: {}", err))?;
        let port = listener
            .local_addr()
            .map_err(|err| format!("local_addr failed: {}", err))?
            .port();
        let server = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                thread::sleep(Duration::from_millis(300));
                drop(stream);
            }
        });

        let token = CancellationToken::new();
        let dialer = Dialer::new(SocketOptions::default(), None, token.clone());
        let mut socket = dialer
            .connect("127.0.0.1", port)
            .await
            .map_err(|err| format!("connect failed: {}", err))?;
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let result = socket.read(16).await;
        canceller
            .await
            .map_err(|err| format!("canceller failed: {}", err))?;
        server.join().map_err(|_| "server panicked".to_owned())?;
        match result {
            Err(TransportError::Cancelled) => Ok(()),
            Err(other) => Err(format!("Unexpected error: {}", other)),
            Ok(bytes) => Err(format!("Expected cancellation, read {} bytes", bytes.len())),
        }
    })
}

#[test]
fn upgrade_without_connector_fails() -> Result<(), String> {
    run_async_test(async {
        let (port, server) = scripted_server(Vec::new())?;
        let dialer = dialer(64);
        let socket = dialer
            .connect("127.0.0.1", port)
            .await
            .map_err(|err| format!("connect failed: {}", err))?;
        let result = dialer.upgrade(socket, "localhost").await;
        server.join().map_err(|_| "server panicked".to_owned())?;
        match result {
            Err(TransportError::TlsUnavailable { .. }) => Ok(()),
            Err(other) => Err(format!("Unexpected error: {}", other)),
            Ok(_) => Err("Expected TLS to be unavailable".to_owned()),
        }
    })
}

#[test]
fn connection_reuse_follows_keep_alive() -> Result<(), String> {
    run_async_test(async {
        let listener =
            TcpListener::bind("127.0.0.1:0").map_err(|err| format!("bind failed: {}", err))?;
        let port = listener
            .local_addr()
            .map_err(|err| format!("local_addr failed: {}", err))?
            .port();
        let server = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                thread::sleep(Duration::from_millis(200));
                drop(stream);
            }
        });

        let socket = dialer(64)
            .connect("127.0.0.1", port)
            .await
            .map_err(|err| format!("connect failed: {}", err))?;
        let key = ConnectionKey {
            tls: false,
            host: "127.0.0.1".to_owned(),
            port,
        };
        let mut connection = Connection::new();
        connection
            .attach(socket, key.clone(), ProtocolState::Http(HttpState::default()))
            .await;
        if connection.can_reuse(&key) {
            return Err("Fresh connection has no keep-alive yet".to_owned());
        }

        connection.begin();
        connection.finish(KeepAlive {
            reusable: true,
            max_uses: Some(1),
            timeout: None,
        });
        if !connection.can_reuse(&key) {
            return Err("Expected reuse with one use left".to_owned());
        }
        let other = ConnectionKey {
            port: port.wrapping_add(1),
            ..key.clone()
        };
        if connection.can_reuse(&other) {
            return Err("Reuse must be limited to the same endpoint".to_owned());
        }

        connection.begin();
        connection.finish(KeepAlive {
            reusable: true,
            max_uses: Some(0),
            timeout: None,
        });
        if connection.can_reuse(&key) {
            return Err("Exhausted use budget must prevent reuse".to_owned());
        }
        connection.release().await;
        if connection.is_open() {
            return Err("Spent use budget should close the socket on release".to_owned());
        }
        server.join().map_err(|_| "server panicked".to_owned())?;
        Ok(())
    })
}
