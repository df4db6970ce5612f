use thiserror::Error;

use super::{ConfigError, CrewError, UrlError, ValidationError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("URL error: {0}")]
    Url(#[from] UrlError),
    #[error("Crew error: {0}")]
    Crew(#[from] CrewError),
    #[error("Excessive socket failure: {failures} failed transactions (threshold {threshold}).")]
    ExcessiveFailures { failures: u64, threshold: u64 },
    #[error("Probe of {url} failed: {reason}")]
    ProbeFailed { url: String, reason: String },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn url<E>(error: E) -> Self
    where
        E: Into<UrlError>,
    {
        error.into().into()
    }
}
