use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::{ProtocolError, TransactionError};
use crate::transport::Socket;

const MAX_REPLY_LINE: usize = 4 * 1024;

/// A complete, possibly multi-line, control-channel reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

/// Splits a reply line into its code, whether more lines follow, and the
/// text.
///
/// # Errors
///
/// Returns `MalformedFtpReply` when the line does not start with a
/// three-digit code.
pub fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), ProtocolError> {
    let malformed = || ProtocolError::MalformedFtpReply {
        line: line.to_owned(),
    };
    let digits = line.get(..3).ok_or_else(malformed)?;
    if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(malformed());
    }
    let code = digits.parse::<u16>().or_else(|_| Err(malformed()))?;
    let rest = line.get(3..).unwrap_or_default();
    match rest.chars().next() {
        None => Ok((code, false, "")),
        Some('-') => Ok((code, true, rest.get(1..).unwrap_or_default())),
        Some(' ') => Ok((code, false, rest.get(1..).unwrap_or_default())),
        Some(_) => Err(malformed()),
    }
}

/// Reads one reply. Continuation lines are joined with `\n`; the reply ends
/// at the first line carrying the same code followed by a space.
///
/// # Errors
///
/// Returns transport errors, `EmptyResponse` when the server hung up, and
/// `MalformedFtpReply` for garbage.
pub async fn read_reply(socket: &mut Socket) -> Result<Reply, TransactionError> {
    let first = socket
        .read_line(MAX_REPLY_LINE)
        .await?
        .ok_or(ProtocolError::EmptyResponse)?;
    let (code, mut more, text) = parse_reply_line(&first)?;
    let mut text = text.to_owned();
    while more {
        let line = socket
            .read_line(MAX_REPLY_LINE)
            .await?
            .ok_or(ProtocolError::EmptyResponse)?;
        if let Ok((next, false, last)) = parse_reply_line(&line)
            && next == code
        {
            text.push('\n');
            text.push_str(last);
            more = false;
        } else {
            text.push('\n');
            text.push_str(line.trim_start());
        }
    }
    Ok(Reply { code, text })
}

/// Fails unless `reply` carries one of the `accepted` codes.
///
/// # Errors
///
/// Returns `FtpReply` naming the command and the server's answer.
pub fn expect(command: &'static str, reply: Reply, accepted: &[u16]) -> Result<Reply, ProtocolError> {
    if accepted.contains(&reply.code) {
        Ok(reply)
    } else {
        Err(ProtocolError::FtpReply {
            command,
            code: reply.code,
            text: reply.text,
        })
    }
}

/// Extracts the data address from a `227 Entering Passive Mode
/// (h1,h2,h3,h4,p1,p2)` reply. The parentheses are optional.
///
/// # Errors
///
/// Returns `MalformedPassiveReply` unless exactly six byte values are found.
pub fn parse_passive(text: &str) -> Result<SocketAddrV4, ProtocolError> {
    let malformed = || ProtocolError::MalformedPassiveReply {
        text: text.to_owned(),
    };
    let start = text.find('(').map_or(0, |open| open.saturating_add(1));
    let inner = text
        .get(start..)
        .unwrap_or_default()
        .split(')')
        .next()
        .unwrap_or_default()
        .trim_start_matches(|ch: char| !ch.is_ascii_digit());
    let numbers = inner
        .split(',')
        .map(|part| {
            part.trim()
                .trim_end_matches(|ch: char| !ch.is_ascii_digit())
                .parse::<u8>()
        })
        .collect::<Result<Vec<u8>, _>>()
        .or_else(|_| Err(malformed()))?;
    let [a, b, c, d, high, low] = numbers.as_slice() else {
        return Err(malformed());
    };
    Ok(SocketAddrV4::new(
        Ipv4Addr::new(*a, *b, *c, *d),
        u16::from_be_bytes([*high, *low]),
    ))
}

/// Argument of a `PORT` command for `addr`.
#[must_use]
pub fn port_argument(addr: SocketAddrV4) -> String {
    let [a, b, c, d] = addr.ip().octets();
    let [high, low] = addr.port().to_be_bytes();
    format!("{},{},{},{},{},{}", a, b, c, d, high, low)
}
