use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("No URL given. Pass a URL or --file.")]
    NoUrls,
    #[error("Invalid URL '{url}': {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unsupported URL scheme '{scheme}' in '{url}'.")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("Unsupported method '{method}' on line {line}.")]
    UnsupportedMethod { method: String, line: usize },
    #[error("Failed to read URL file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("URL file '{path}' contained no URLs.")]
    EmptyFile { path: PathBuf },
    #[error("Failed to read body file '{path}': {source}")]
    ReadBody {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
