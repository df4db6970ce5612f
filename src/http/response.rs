use std::time::Duration;

use crate::error::{ProtocolError, TransactionError};
use crate::transport::{KeepAlive, Socket, TransferMode};

/// Longest status or header line accepted.
pub const MAX_LINE_LEN: usize = 8 * 1024;
/// Most header lines accepted in one response head.
pub const MAX_HEADERS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// First value of `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn header_all<'head>(&'head self, name: &'head str) -> impl Iterator<Item = &'head str> {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn header_has_token(&self, name: &str, token: &str) -> bool {
        self.header_all(name).any(|value| {
            value
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case(token))
        })
    }

    /// # Errors
    ///
    /// Returns an error when `Content-Length` is not a non-negative integer.
    pub fn content_length(&self) -> Result<Option<u64>, ProtocolError> {
        let Some(value) = self.header("content-length") else {
            return Ok(None);
        };
        value.trim().parse::<u64>().map(Some).or_else(|_| {
            Err(ProtocolError::InvalidContentLength {
                value: value.to_owned(),
            })
        })
    }

    /// How the body following this head is delimited.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable `Content-Length`.
    pub fn transfer_mode(&self, head_request: bool) -> Result<TransferMode, ProtocolError> {
        if head_request
            || self.status == 204
            || self.status == 304
            || (100..200).contains(&self.status)
        {
            return Ok(TransferMode::Length(0));
        }
        if self.header_has_token("transfer-encoding", "chunked") {
            return Ok(TransferMode::Chunked);
        }
        Ok(match self.content_length()? {
            Some(length) => TransferMode::Length(length),
            None => TransferMode::UntilClose,
        })
    }

    /// Persistence offered by the server, from `Connection` and `Keep-Alive`.
    #[must_use]
    pub fn keep_alive(&self) -> KeepAlive {
        let reusable = match self.version {
            Version::Http11 => !self.header_has_token("connection", "close"),
            Version::Http10 => self.header_has_token("connection", "keep-alive"),
        };
        if !reusable {
            return KeepAlive::close();
        }
        let mut keep_alive = KeepAlive {
            reusable,
            max_uses: None,
            timeout: None,
        };
        if let Some(params) = self.header("keep-alive") {
            for param in params.split(',') {
                let Some((key, value)) = param.split_once('=') else {
                    continue;
                };
                let value = value.trim();
                match key.trim().to_ascii_lowercase().as_str() {
                    "max" => keep_alive.max_uses = value.parse().ok(),
                    "timeout" => {
                        keep_alive.timeout = value.parse().ok().map(Duration::from_secs);
                    }
                    _ => {}
                }
            }
        }
        keep_alive
    }

    #[must_use]
    pub fn is_html(&self) -> bool {
        self.header("content-type")
            .is_some_and(|value| value.to_ascii_lowercase().contains("html"))
    }
}

/// Parses `HTTP/1.x NNN reason`.
///
/// # Errors
///
/// Returns an error when the version or status code is missing or invalid.
pub fn parse_status_line(line: &str) -> Result<(Version, u16, String), ProtocolError> {
    let malformed = || ProtocolError::MalformedStatusLine {
        line: line.to_owned(),
    };
    let mut parts = line.splitn(3, ' ');
    let version = match parts.next() {
        Some("HTTP/1.1") => Version::Http11,
        Some("HTTP/1.0") => Version::Http10,
        _ => return Err(malformed()),
    };
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..1000).contains(code))
        .ok_or_else(malformed)?;
    let reason = parts.next().unwrap_or_default().trim().to_owned();
    Ok((version, status, reason))
}

fn parse_header_line(line: &str) -> Result<(String, String), ProtocolError> {
    match line.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(ProtocolError::MalformedHeader {
            line: line.to_owned(),
        }),
    }
}

/// Reads header lines up to the terminating blank line. Folded
/// continuation lines are joined onto the previous header.
///
/// # Errors
///
/// Returns transport errors, malformed lines, or too many headers.
pub async fn read_headers(socket: &mut Socket) -> Result<Vec<(String, String)>, TransactionError> {
    let mut headers: Vec<(String, String)> = Vec::new();
    loop {
        let Some(line) = socket.read_line(MAX_LINE_LEN).await? else {
            return Ok(headers);
        };
        if line.is_empty() {
            return Ok(headers);
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }
        }
        if headers.len() >= MAX_HEADERS {
            return Err(ProtocolError::TooManyHeaders { limit: MAX_HEADERS }.into());
        }
        headers.push(parse_header_line(&line)?);
    }
}

/// Reads one response head, skipping interim `100 Continue` style heads.
///
/// # Errors
///
/// Returns `EmptyResponse` when the peer closed before a status line, or
/// any transport or parse error.
pub async fn read_head(socket: &mut Socket) -> Result<ResponseHead, TransactionError> {
    loop {
        let line = loop {
            match socket.read_line(MAX_LINE_LEN).await? {
                None => return Err(ProtocolError::EmptyResponse.into()),
                Some(line) if line.is_empty() => {}
                Some(line) => break line,
            }
        };
        let (version, status, reason) = parse_status_line(&line)?;
        let headers = read_headers(socket).await?;
        if (100..200).contains(&status) && status != 101 {
            continue;
        }
        return Ok(ResponseHead {
            version,
            status,
            reason,
            headers,
        });
    }
}
