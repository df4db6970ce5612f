use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Server closed the connection without a response.")]
    EmptyResponse,
    #[error("Malformed status line '{line}'.")]
    MalformedStatusLine { line: String },
    #[error("Malformed header line '{line}'.")]
    MalformedHeader { line: String },
    #[error("Response carried more than {limit} headers.")]
    TooManyHeaders { limit: usize },
    #[error("Invalid content length '{value}'.")]
    InvalidContentLength { value: String },
    #[error("Invalid chunk size line '{line}'.")]
    InvalidChunkSize { line: String },
    #[error("Connection closed after {received} of {expected} body bytes.")]
    TruncatedBody { expected: u64, received: u64 },
    #[error("Server sent an empty response body.")]
    ZeroByteBody,
    #[error("Failed to decode {encoding} body: {source}")]
    Decode {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Redirect from {url} has no Location header.")]
    MissingLocation { url: String },
    #[error("Invalid redirect location '{location}': {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Redirect limit of {limit} exceeded.")]
    RedirectLimit { limit: u32 },
    #[error("Proxy CONNECT to {target} answered {status}.")]
    ProxyConnect { target: String, status: u16 },
    #[error("Unsupported URL scheme '{scheme}'.")]
    UnsupportedScheme { scheme: String },
    #[error("URL '{url}' has no host.")]
    MissingHost { url: String },
    #[error("Malformed FTP reply '{line}'.")]
    MalformedFtpReply { line: String },
    #[error("FTP server answered {command} with {code}: {text}")]
    FtpReply {
        command: &'static str,
        code: u16,
        text: String,
    },
    #[error("Malformed passive-mode reply '{text}'.")]
    MalformedPassiveReply { text: String },
    #[error("Active FTP needs an IPv4 control connection, local address is {addr}.")]
    ActiveModeAddress { addr: String },
    #[error("FTP transfer moved {transferred} bytes, expected {expected}.")]
    FtpSizeMismatch { expected: u64, transferred: u64 },
}
