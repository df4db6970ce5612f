use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid header format: '{value}'. Expected 'Key: Value'")]
    InvalidHeaderFormat { value: String },
    #[error("Invalid credentials '{value}'. Expected 'user:password' or 'user:password@realm'.")]
    InvalidCredentials { value: String },
    #[error("Invalid proxy '{value}'. Expected 'host:port'.")]
    InvalidProxy { value: String },
    #[error("Invalid cookie '{value}'. Expected 'name=value'.")]
    InvalidCookie { value: String },
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Cannot combine --reps and --time.")]
    RepsAndTimeConflict,
    #[error("Concurrency {concurrency} exceeds the configured limit of {limit}.")]
    ConcurrencyOverLimit { concurrency: usize, limit: usize },
    #[error("Failed to build TLS connector: {source}")]
    TlsConnector {
        #[source]
        source: native_tls::Error,
    },
    #[error("Failed to compile link pattern: {source}")]
    LinkPattern {
        #[source]
        source: regex::Error,
    },
}
