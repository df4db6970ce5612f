use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

use crate::error::{ProtocolError, TransactionError};
use crate::transport::{Socket, TransferMode};

use super::response::{MAX_LINE_LEN, read_headers};

/// A received body. `bytes` counts payload bytes as they crossed the wire,
/// excluding chunk framing; `content` is only kept when asked for.
#[derive(Debug, Default)]
pub struct Body {
    pub bytes: u64,
    pub content: Option<Vec<u8>>,
    pub trailers: Vec<(String, String)>,
}

/// Reads the body delimited by `mode`. With `keep` the payload is collected
/// into `Body::content`, otherwise it is discarded as it arrives.
///
/// # Errors
///
/// Returns transport errors, truncated bodies, and malformed chunk framing.
pub async fn read_body(
    socket: &mut Socket,
    mode: TransferMode,
    keep: bool,
) -> Result<Body, TransactionError> {
    let mut content = keep.then(Vec::new);
    let mut body = Body::default();
    match mode {
        TransferMode::None => {}
        TransferMode::Length(expected) => {
            let received = socket.read_into(content.as_mut(), expected).await?;
            if received < expected {
                return Err(ProtocolError::TruncatedBody { expected, received }.into());
            }
            body.bytes = received;
        }
        TransferMode::UntilClose => {
            body.bytes = socket.read_to_close(content.as_mut()).await?;
        }
        TransferMode::Chunked => loop {
            let line = socket
                .read_line(MAX_LINE_LEN)
                .await?
                .ok_or(ProtocolError::TruncatedBody {
                    expected: body.bytes.saturating_add(1),
                    received: body.bytes,
                })?;
            let size = parse_chunk_size(&line)?;
            if size == 0 {
                body.trailers = read_headers(socket).await?;
                break;
            }
            let received = socket.read_into(content.as_mut(), size).await?;
            body.bytes = body.bytes.saturating_add(received);
            if received < size {
                return Err(ProtocolError::TruncatedBody {
                    expected: body.bytes.saturating_add(size.saturating_sub(received)),
                    received: body.bytes,
                }
                .into());
            }
            // CRLF closing the chunk payload.
            socket.read_line(MAX_LINE_LEN).await?;
        },
    }
    body.content = content;
    Ok(body)
}

/// Parses a chunk-size line, ignoring chunk extensions.
///
/// # Errors
///
/// Returns `InvalidChunkSize` when the size is not hexadecimal.
pub fn parse_chunk_size(line: &str) -> Result<u64, ProtocolError> {
    let size = line.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(size, 16).or_else(|_| {
        Err(ProtocolError::InvalidChunkSize {
            line: line.to_owned(),
        })
    })
}

/// Inflates `content` according to a `Content-Encoding` value. Unknown or
/// identity encodings are returned unchanged.
///
/// # Errors
///
/// Returns `ProtocolError::Decode` when the compressed stream is corrupt.
pub fn decode(content: Vec<u8>, encoding: Option<&str>) -> Result<Vec<u8>, ProtocolError> {
    let Some(encoding) = encoding.map(|value| value.trim().to_ascii_lowercase()) else {
        return Ok(content);
    };
    let mut decoded = Vec::new();
    match encoding.as_str() {
        "gzip" | "x-gzip" => {
            GzDecoder::new(content.as_slice())
                .read_to_end(&mut decoded)
                .map_err(|err| ProtocolError::Decode {
                    encoding: "gzip",
                    source: err,
                })?;
        }
        "deflate" => {
            // Servers disagree on whether deflate means zlib-wrapped or raw.
            if ZlibDecoder::new(content.as_slice())
                .read_to_end(&mut decoded)
                .is_err()
            {
                decoded.clear();
                DeflateDecoder::new(content.as_slice())
                    .read_to_end(&mut decoded)
                    .map_err(|err| ProtocolError::Decode {
                        encoding: "deflate",
                        source: err,
                    })?;
            }
        }
        _ => return Ok(content),
    }
    Ok(decoded)
}
