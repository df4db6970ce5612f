use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RunSettings;
use crate::error::{AppError, AppResult};
use crate::http::{
    AuthTracker, CookieJar, CookieOwner, HttpRunner, LinkExtractor, StandardAuthCodec,
};
use crate::transport::{Connection, Dialer, build_tls_connector};
use crate::urls::{Scheme, UrlEntry};

/// Sends `entry` once and returns the status line and response headers,
/// one per output line.
///
/// # Errors
///
/// Returns `ProbeFailed` for FTP targets and when no response arrives.
pub(crate) async fn run_probe(settings: &Arc<RunSettings>, entry: &UrlEntry) -> AppResult<Vec<String>> {
    if entry.scheme() == Scheme::Ftp {
        return Err(AppError::ProbeFailed {
            url: entry.url.to_string(),
            reason: "only HTTP and HTTPS targets can be probed".to_owned(),
        });
    }

    let tls = Arc::new(build_tls_connector(settings.insecure)?);
    let dialer = Dialer::new(settings.socket, Some(tls), CancellationToken::new());
    let jar = Arc::new(CookieJar::new());
    for (name, value) in &settings.cookies {
        jar.seed(name, value);
    }
    let auth = AuthTracker::new(
        Box::new(StandardAuthCodec::new(rand::random::<u64>())),
        settings.credentials.clone(),
        settings
            .proxy
            .as_ref()
            .and_then(|proxy| proxy.credentials.clone()),
        settings.bids,
    );
    let mut runner = HttpRunner::new(
        Arc::clone(settings),
        dialer,
        jar,
        Arc::new(LinkExtractor::new()?),
        CookieOwner::Browser(0),
        auth,
    );

    let mut conn = Connection::new();
    let head = runner
        .probe(&mut conn, entry)
        .await
        .map_err(|err| AppError::ProbeFailed {
            url: entry.url.to_string(),
            reason: err.to_string(),
        })?;
    conn.force_close().await;

    let mut lines = Vec::with_capacity(head.headers.len().saturating_add(1));
    lines.push(
        format!("{} {} {}", head.version.as_str(), head.status, head.reason)
            .trim_end()
            .to_owned(),
    );
    for (name, value) in &head.headers {
        lines.push(format!("{}: {}", name, value));
    }
    Ok(lines)
}
