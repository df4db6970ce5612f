//! Target URLs and the URL-file format.
//!
//! Each non-comment line is `URL [METHOD] [body | <file]`.

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::Method;
use url::Url;

use crate::error::UrlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Ftp,
}

impl Scheme {
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
            Scheme::Ftp => 21,
        }
    }

    #[must_use]
    pub const fn is_tls(self) -> bool {
        matches!(self, Scheme::Https)
    }
}

/// One request target from the command line or the URL file.
#[derive(Debug, Clone)]
pub struct UrlEntry {
    pub url: Url,
    pub method: Method,
    pub body: Option<Arc<[u8]>>,
}

impl UrlEntry {
    /// Parses a bare URL as a GET target.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is invalid or uses an unsupported scheme.
    pub fn get(raw: &str) -> Result<Self, UrlError> {
        Ok(Self {
            url: normalize(raw)?,
            method: Method::GET,
            body: None,
        })
    }

    #[must_use]
    pub fn from_url(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            body: None,
        }
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        scheme_of(&self.url).unwrap_or(Scheme::Http)
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.url
            .port()
            .unwrap_or_else(|| self.scheme().default_port())
    }

    /// Path plus query, as sent in an origin-form request line.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_owned(),
        }
    }

    /// `Host` header value; the port is omitted when it is the default.
    #[must_use]
    pub fn host_header(&self) -> String {
        let host = self.host().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_owned(),
        }
    }
}

fn scheme_of(url: &Url) -> Option<Scheme> {
    match url.scheme() {
        "http" => Some(Scheme::Http),
        "https" => Some(Scheme::Https),
        "ftp" => Some(Scheme::Ftp),
        _ => None,
    }
}

/// Parses `raw`, defaulting to `http://` when no scheme is present.
///
/// # Errors
///
/// Returns an error when the URL is invalid, has no host, or uses a scheme
/// other than http, https, or ftp.
pub fn normalize(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{}", trimmed)
    };
    let url = Url::parse(&candidate).map_err(|err| UrlError::Invalid {
        url: trimmed.to_owned(),
        source: err,
    })?;
    if scheme_of(&url).is_none() {
        return Err(UrlError::UnsupportedScheme {
            url: trimmed.to_owned(),
            scheme: url.scheme().to_owned(),
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::Invalid {
            url: trimmed.to_owned(),
            source: url::ParseError::EmptyHost,
        });
    }
    Ok(url)
}

fn parse_method(token: &str, line: usize) -> Result<Option<Method>, UrlError> {
    let method = match token.to_ascii_uppercase().as_str() {
        "GET" => Method::GET,
        "POST" => Method::POST,
        "PUT" => Method::PUT,
        "PATCH" => Method::PATCH,
        "DELETE" => Method::DELETE,
        "HEAD" => Method::HEAD,
        "OPTIONS" => Method::OPTIONS,
        _ if token.len() > 2 && token.chars().all(|ch| ch.is_ascii_uppercase()) => {
            return Err(UrlError::UnsupportedMethod {
                method: token.to_owned(),
                line,
            });
        }
        _ => return Ok(None),
    };
    Ok(Some(method))
}

fn read_body(arg: &str) -> Result<Arc<[u8]>, UrlError> {
    match arg.strip_prefix('<') {
        Some(path) => {
            let path = PathBuf::from(path.trim());
            fs::read(&path)
                .map(Arc::from)
                .map_err(|err| UrlError::ReadBody { path, source: err })
        }
        None => Ok(Arc::from(arg.as_bytes())),
    }
}

/// Parses one URL-file line. Blank lines and `#` comments yield `None`.
///
/// # Errors
///
/// Returns an error for invalid URLs, unsupported methods, or an unreadable
/// `<file` body.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<UrlEntry>, UrlError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (raw_url, rest) = trimmed
        .split_once(char::is_whitespace)
        .map_or((trimmed, ""), |(url, rest)| (url, rest.trim_start()));
    let url = normalize(raw_url)?;

    let (method_token, after_method) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(method, body)| (method, body.trim()));
    let (method, body_arg) = match parse_method(method_token, line_no)? {
        Some(method) => (method, after_method),
        None if rest.is_empty() => (Method::GET, ""),
        None => (Method::POST, rest.trim()),
    };
    let body = if body_arg.is_empty() {
        None
    } else {
        Some(read_body(body_arg)?)
    };

    Ok(Some(UrlEntry { url, method, body }))
}

/// Loads every entry from a URL file.
///
/// # Errors
///
/// Returns an error when the file cannot be read, a line is invalid, or the
/// file holds no URLs.
pub fn load_file(path: &Path) -> Result<Vec<UrlEntry>, UrlError> {
    let contents = fs::read_to_string(path).map_err(|err| UrlError::ReadFile {
        path: path.to_path_buf(),
        source: err,
    })?;
    let mut entries = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if let Some(entry) = parse_line(line, index.saturating_add(1))? {
            entries.push(entry);
        }
    }
    if entries.is_empty() {
        return Err(UrlError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    Ok(entries)
}
