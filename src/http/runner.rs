use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use http::Method;
use tokio::time::Instant;
use url::Url;

use crate::config::RunSettings;
use crate::error::{ProtocolError, TransactionError, TransportError};
use crate::transport::{
    Connection, ConnectionKey, Dialer, HttpState, KeepAlive, ProtocolState, Socket, TransferMode,
};
use crate::urls::UrlEntry;

use super::auth::{AuthTracker, RealmClass};
use super::body::{Body, decode, read_body};
use super::cache::{CacheStore, Validators};
use super::cookies::{CookieJar, CookieOwner};
use super::links::LinkExtractor;
use super::request::{RequestHead, sends_body};
use super::response::{ResponseHead, read_head};

/// Whether a request was picked by the user or discovered in a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Primary,
    Resource,
}

/// Result of one logical transaction, redirect and auth hops included.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Status of the last response received, if any.
    pub status: Option<u16>,
    pub bytes: u64,
    pub elapsed: Duration,
    pub error: Option<TransactionError>,
    /// Sub-resources found in the final page.
    pub discovered: Vec<Url>,
    pub from_cache: bool,
}

impl Outcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// A hit is a transaction that produced a response, real or cached.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        self.status.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Direct,
    Forward,
    Tunnel,
}

struct Pending {
    method: Method,
    url: Url,
    body: Option<Arc<[u8]>>,
}

struct Exchange {
    head: ResponseHead,
    body: Body,
}

/// Drives HTTP transactions for one simulated user.
pub struct HttpRunner {
    settings: Arc<RunSettings>,
    dialer: Dialer,
    jar: Arc<CookieJar>,
    links: Arc<LinkExtractor>,
    owner: CookieOwner,
    cache: CacheStore,
    auth: AuthTracker,
}

impl HttpRunner {
    #[must_use]
    pub fn new(
        settings: Arc<RunSettings>,
        dialer: Dialer,
        jar: Arc<CookieJar>,
        links: Arc<LinkExtractor>,
        owner: CookieOwner,
        auth: AuthTracker,
    ) -> Self {
        Self {
            settings,
            dialer,
            jar,
            links,
            owner,
            cache: CacheStore::new(),
            auth,
        }
    }

    /// Runs one logical transaction. Never fails outright: errors are
    /// reported in the returned [`Outcome`].
    pub async fn run(&mut self, conn: &mut Connection, entry: &UrlEntry, kind: FetchKind) -> Outcome {
        let started = Instant::now();
        let mut outcome = Outcome::default();

        if kind == FetchKind::Resource
            && self.settings.cache
            && self.cache.is_valid(entry.url.as_str(), Utc::now())
        {
            tracing::debug!("cached 200 ==> GET {}", entry.url.path());
            outcome.status = Some(200);
            outcome.from_cache = true;
            outcome.elapsed = started.elapsed();
            return outcome;
        }

        self.auth.begin_transaction();
        let mut current = Pending {
            method: entry.method.clone(),
            url: entry.url.clone(),
            body: entry.body.clone(),
        };
        let mut redirects: u32 = 0;

        loop {
            let hop_started = Instant::now();
            let exchange = match self.exchange(conn, &current, kind).await {
                Ok(exchange) => exchange,
                Err(err) => {
                    conn.force_close().await;
                    outcome.error = Some(err);
                    break;
                }
            };
            let status = exchange.head.status;
            outcome.status = Some(status);
            outcome.bytes = outcome.bytes.saturating_add(exchange.body.bytes);
            tracing::debug!(
                "{} {} {:.2} secs: {} bytes ==> {} {}",
                exchange.head.version.as_str(),
                status,
                hop_started.elapsed().as_secs_f64(),
                exchange.body.bytes,
                current.method,
                current.url.path()
            );

            match status {
                200..=299 => {
                    if !self.settings.allow_zero_data
                        && status == 200
                        && exchange.body.bytes == 0
                        && current.method != Method::HEAD
                    {
                        outcome.error = Some(ProtocolError::ZeroByteBody.into());
                        break;
                    }
                    if self.settings.cache {
                        self.cache.record(
                            current.url.as_str(),
                            Validators::from_head(&exchange.head, Utc::now()),
                        );
                    }
                    match self.inspect_page(exchange, &current.url) {
                        Ok((discovered, refresh)) => {
                            outcome.discovered = discovered;
                            if let Some(target) = refresh
                                && self.settings.follow_redirects
                            {
                                if let Err(err) = self.count_redirect(&mut redirects) {
                                    outcome.error = Some(err);
                                    break;
                                }
                                outcome.discovered.clear();
                                current = Pending {
                                    method: Method::GET,
                                    url: target,
                                    body: None,
                                };
                                continue;
                            }
                        }
                        Err(err) => outcome.error = Some(err),
                    }
                    break;
                }
                301..=303 | 307 | 308 if self.settings.follow_redirects => {
                    let next = self
                        .count_redirect(&mut redirects)
                        .and_then(|()| redirect_target(&exchange.head, &current.url));
                    match next {
                        Ok(target) => {
                            if matches!(status, 301..=303) {
                                current.method = Method::GET;
                                current.body = None;
                            }
                            current.url = target;
                        }
                        Err(err) => {
                            outcome.error = Some(err);
                            break;
                        }
                    }
                }
                401 | 407 => {
                    let Some(class) = RealmClass::from_status(status) else {
                        break;
                    };
                    let challenges = exchange.head.header_all(class.challenge_header());
                    if let Err(err) = self.auth.respond(class, status, challenges) {
                        tracing::debug!("{}", err);
                        outcome.error = Some(err.into());
                        break;
                    }
                }
                408 | 500..=599 => {
                    conn.force_close().await;
                    outcome.error = Some(TransactionError::Status { status });
                    break;
                }
                400..=499 => {
                    outcome.error = Some(TransactionError::Status { status });
                    break;
                }
                _ => break,
            }
        }

        outcome.elapsed = started.elapsed();
        outcome
    }

    /// Sends `entry` once, without following redirects or answering
    /// challenges, and returns the response head.
    ///
    /// # Errors
    ///
    /// Returns the transport or protocol error that ended the exchange.
    pub async fn probe(
        &mut self,
        conn: &mut Connection,
        entry: &UrlEntry,
    ) -> Result<ResponseHead, TransactionError> {
        self.auth.begin_transaction();
        let pending = Pending {
            method: entry.method.clone(),
            url: entry.url.clone(),
            body: entry.body.clone(),
        };
        match self.exchange(conn, &pending, FetchKind::Primary).await {
            Ok(exchange) => Ok(exchange.head),
            Err(err) => {
                conn.force_close().await;
                Err(err)
            }
        }
    }

    fn count_redirect(&self, redirects: &mut u32) -> Result<(), TransactionError> {
        if *redirects >= self.settings.max_redirects {
            return Err(ProtocolError::RedirectLimit {
                limit: self.settings.max_redirects,
            }
            .into());
        }
        *redirects = redirects.saturating_add(1);
        Ok(())
    }

    /// Looks for sub-resources and a meta refresh in an HTML body.
    fn inspect_page(
        &self,
        exchange: Exchange,
        base: &Url,
    ) -> Result<(Vec<Url>, Option<Url>), TransactionError> {
        let Some(content) = exchange.body.content else {
            return Ok((Vec::new(), None));
        };
        let content = decode(content, exchange.head.header("content-encoding"))?;
        let html = String::from_utf8_lossy(&content);
        let links = self.links.extract(&html, base);
        Ok((links.resources, links.refresh))
    }

    async fn exchange(
        &mut self,
        conn: &mut Connection,
        pending: &Pending,
        kind: FetchKind,
    ) -> Result<Exchange, TransactionError> {
        let route = self.acquire(conn, &pending.url).await?;
        let request = self.build_request(pending, route)?;
        let host = pending.url.host_str().unwrap_or_default().to_owned();
        let head_request = pending.method == Method::HEAD;
        let keep_content = self.settings.parser && kind == FetchKind::Primary;

        let socket = conn.begin().ok_or(TransportError::Closed)?;
        socket.write_all(&request.encode()).await?;
        let head = read_head(socket).await?;
        let mode = head.transfer_mode(head_request)?;
        let keep = keep_content && (200..300).contains(&head.status) && head.is_html();
        let body = read_body(socket, mode, keep).await?;

        let now = Utc::now();
        for set_cookie in head.header_all("set-cookie") {
            self.jar.ingest(set_cookie, &host, self.owner, now);
        }
        if let ProtocolState::Http(state) = conn.state_mut() {
            state.transfer = mode;
        }
        let keep_alive = if self.settings.keep_alive && mode != TransferMode::UntilClose {
            head.keep_alive()
        } else {
            KeepAlive::close()
        };
        conn.finish(keep_alive);
        conn.release().await;
        Ok(Exchange { head, body })
    }

    fn build_request(&mut self, pending: &Pending, route: Route) -> Result<RequestHead, TransactionError> {
        let entry = UrlEntry::from_url(pending.url.clone());
        let origin_target = entry.path_and_query();
        let target = if route == Route::Forward {
            let mut absolute = pending.url.clone();
            absolute.set_fragment(None);
            absolute.to_string()
        } else {
            origin_target.clone()
        };

        let mut request = RequestHead::new(pending.method.clone(), target);
        request.set_header("Host", entry.host_header());
        request.set_header("Accept", "*/*");
        if self.settings.gzip {
            request.set_header("Accept-Encoding", "gzip, deflate");
        }
        request.set_header("User-Agent", self.settings.user_agent.as_str());
        request.set_header(
            "Connection",
            if self.settings.keep_alive {
                "keep-alive"
            } else {
                "close"
            },
        );
        if let Some(cookies) = self.jar.header_for(
            entry.host().unwrap_or_default(),
            pending.url.path(),
            self.owner,
            Utc::now(),
        ) {
            request.set_header("Cookie", cookies);
        }
        if self.settings.cache {
            for (name, value) in self.cache.conditional_headers(pending.url.as_str()) {
                request.set_header(name, value);
            }
        }
        if let Some((name, value)) = self
            .auth
            .header(RealmClass::Www, &pending.method, &origin_target)?
        {
            request.set_header(name, value);
        }
        if route == Route::Forward
            && let Some((name, value)) =
                self.auth
                    .header(RealmClass::Proxy, &pending.method, request.target())?
        {
            request.set_header(name, value);
        }
        for (name, value) in &self.settings.headers {
            request.set_header(name, value.as_str());
        }
        if sends_body(&pending.method) || pending.body.is_some() {
            request.set_body(pending.body.as_deref().unwrap_or_default());
        }
        Ok(request)
    }

    /// Makes sure `conn` holds a socket able to carry a request to `url`.
    async fn acquire(&mut self, conn: &mut Connection, url: &Url) -> Result<Route, TransactionError> {
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => {
                return Err(ProtocolError::UnsupportedScheme {
                    scheme: other.to_owned(),
                }
                .into());
            }
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ProtocolError::MissingHost {
                url: url.to_string(),
            })?
            .to_owned();
        let port = url.port_or_known_default().unwrap_or(if tls { 443 } else { 80 });

        let proxy = self.settings.proxy.clone();
        let (route, key) = match &proxy {
            None => (Route::Direct, ConnectionKey { tls, host: host.clone(), port }),
            Some(proxy) if !tls => (
                Route::Forward,
                ConnectionKey {
                    tls: false,
                    host: proxy.host.clone(),
                    port: proxy.port,
                },
            ),
            Some(_) => (Route::Tunnel, ConnectionKey { tls, host: host.clone(), port }),
        };

        if self.settings.keep_alive && conn.can_reuse(&key) {
            return Ok(route);
        }

        let socket = match (&proxy, route) {
            (Some(proxy), Route::Tunnel) => {
                let tunnel = self.open_tunnel(&proxy.host, proxy.port, &host, port).await?;
                self.dialer.upgrade(tunnel, &host).await?
            }
            (Some(proxy), _) => self.dialer.connect(&proxy.host, proxy.port).await?,
            (None, _) if tls => self.dialer.connect_tls(&host, port).await?,
            (None, _) => self.dialer.connect(&host, port).await?,
        };
        conn.attach(
            socket,
            key,
            ProtocolState::Http(HttpState {
                transfer: TransferMode::None,
                via_proxy: proxy.is_some(),
            }),
        )
        .await;
        Ok(route)
    }

    /// Opens a `CONNECT` tunnel through the proxy, answering 407 challenges
    /// until the proxy realm runs out of bids.
    async fn open_tunnel(
        &mut self,
        proxy_host: &str,
        proxy_port: u16,
        host: &str,
        port: u16,
    ) -> Result<Socket, TransactionError> {
        let authority = format!("{}:{}", host, port);
        loop {
            let mut socket = self.dialer.connect(proxy_host, proxy_port).await?;
            let mut request = RequestHead::new(Method::CONNECT, authority.as_str());
            request.set_header("Host", authority.as_str());
            request.set_header("User-Agent", self.settings.user_agent.as_str());
            if let Some((name, value)) =
                self.auth
                    .header(RealmClass::Proxy, &Method::CONNECT, &authority)?
            {
                request.set_header(name, value);
            }
            socket.write_all(&request.encode()).await?;
            let head = read_head(&mut socket).await?;
            match head.status {
                200..=299 => return Ok(socket),
                407 => {
                    socket.close().await;
                    self.auth.respond(
                        RealmClass::Proxy,
                        407,
                        head.header_all(RealmClass::Proxy.challenge_header()),
                    )?;
                }
                status => {
                    socket.close().await;
                    return Err(ProtocolError::ProxyConnect {
                        target: authority,
                        status,
                    }
                    .into());
                }
            }
        }
    }
}

fn redirect_target(head: &ResponseHead, current: &Url) -> Result<Url, TransactionError> {
    let location = head
        .header("location")
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ProtocolError::MissingLocation {
            url: current.to_string(),
        })?;
    current.join(location.trim()).map_err(|err| {
        TransactionError::from(ProtocolError::InvalidLocation {
            location: location.to_owned(),
            source: err,
        })
    })
}
