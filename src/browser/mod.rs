//! One simulated user: picks URLs, paces itself, and drives the HTTP and FTP
//! runners over a single reusable connection.


use std::mem;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_native_tls::TlsConnector;
use tokio_util::sync::CancellationToken;

use crate::config::RunSettings;
use crate::ftp::FtpRunner;
use crate::http::{
    AuthTracker, CookieJar, CookieOwner, FetchKind, HttpRunner, LinkExtractor, Outcome,
    StandardAuthCodec,
};
use crate::metrics::{BrowserStats, FailureGate, Marks};
use crate::transport::{Connection, Dialer};
use crate::urls::{Scheme, UrlEntry};

const MIN_DELAY: Duration = Duration::from_millis(1);

/// State every browser shares with the others.
#[derive(Clone)]
pub struct BrowserContext {
    pub settings: Arc<RunSettings>,
    pub urls: Arc<[UrlEntry]>,
    pub jar: Arc<CookieJar>,
    pub links: Arc<LinkExtractor>,
    pub marks: Arc<Marks>,
    pub gate: Arc<FailureGate>,
    pub tls: Option<Arc<TlsConnector>>,
}

pub struct Browser {
    id: usize,
    context: BrowserContext,
    cancel: CancellationToken,
    rng: StdRng,
    conn: Connection,
    http: HttpRunner,
    ftp: FtpRunner,
    stats: BrowserStats,
}

impl Browser {
    /// Builds browser `id`. `seed` feeds the private RNG and the auth
    /// codec's client nonces.
    #[must_use]
    pub fn new(id: usize, context: &BrowserContext, cancel: CancellationToken, seed: u64) -> Self {
        let settings = Arc::clone(&context.settings);
        let dialer = Dialer::new(settings.socket, context.tls.clone(), cancel.clone());
        let auth = AuthTracker::new(
            Box::new(StandardAuthCodec::new(seed)),
            settings.credentials.clone(),
            settings
                .proxy
                .as_ref()
                .and_then(|proxy| proxy.credentials.clone()),
            settings.bids,
        );
        let http = HttpRunner::new(
            Arc::clone(&settings),
            dialer.clone(),
            Arc::clone(&context.jar),
            Arc::clone(&context.links),
            CookieOwner::Browser(id),
            auth,
        );
        let ftp = FtpRunner::new(settings, dialer);
        Self {
            id,
            context: context.clone(),
            cancel,
            rng: StdRng::seed_from_u64(seed),
            conn: Connection::new(),
            http,
            ftp,
            stats: BrowserStats::default(),
        }
    }

    /// Runs until the repetitions are done, the run is cancelled, or the
    /// failure gate trips.
    pub async fn run(mut self) -> BrowserStats {
        let settings = Arc::clone(&self.context.settings);
        let urls = Arc::clone(&self.context.urls);

        if let Some(login) = settings.login.as_ref()
            && !self.should_stop()
        {
            self.fetch(login).await;
        }

        let len = urls.len();
        let mut index = start_offset(self.id, len, settings.concurrency);
        let mut iteration: u64 = 0;
        while len > 0 && !self.should_stop() {
            if settings.reps.is_some_and(|reps| iteration >= reps) {
                break;
            }
            if !self.pause(settings.delay).await {
                break;
            }
            let pick = if settings.internet {
                self.rng.gen_range(0..len)
            } else {
                index
            };
            if let Some(entry) = urls.get(pick) {
                self.fetch(entry).await;
            }
            if !settings.internet {
                index = index.saturating_add(1);
                if index >= len {
                    index = 0;
                    if settings.expire_session {
                        self.context.jar.clear_owner(CookieOwner::Browser(self.id));
                    }
                }
            }
            iteration = iteration.saturating_add(1);
        }

        self.conn.force_close().await;
        self.stats
    }

    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.context.gate.is_tripped()
    }

    /// Sleeps a random time in `[MIN_DELAY, max]`. Returns `false` when
    /// cancelled meanwhile.
    async fn pause(&mut self, max: Duration) -> bool {
        if max.is_zero() {
            return true;
        }
        let nap = if max <= MIN_DELAY {
            max
        } else {
            self.rng.gen_range(MIN_DELAY..=max)
        };
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(nap) => true,
        }
    }

    /// One primary transaction plus whatever resources its page embeds.
    async fn fetch(&mut self, entry: &UrlEntry) {
        let mut outcome = match entry.scheme() {
            Scheme::Ftp => self.ftp.run(&mut self.conn, entry).await,
            Scheme::Http | Scheme::Https => {
                self.http
                    .run(&mut self.conn, entry, FetchKind::Primary)
                    .await
            }
        };
        let discovered = mem::take(&mut outcome.discovered);
        self.record(&outcome);

        for url in discovered {
            if self.should_stop() {
                break;
            }
            let resource = UrlEntry::from_url(url);
            let outcome = self
                .http
                .run(&mut self.conn, &resource, FetchKind::Resource)
                .await;
            self.record(&outcome);
        }
    }

    fn record(&mut self, outcome: &Outcome) {
        if outcome
            .error
            .as_ref()
            .is_some_and(|err| err.is_cancelled())
        {
            return;
        }
        self.stats.record(
            outcome.is_hit(),
            outcome.is_success(),
            outcome.bytes,
            outcome.elapsed,
        );
        if outcome.is_hit() {
            self.context.marks.record(outcome.elapsed);
        }
        if let Some(err) = outcome.error.as_ref() {
            tracing::debug!("browser {}: {}", self.id, err);
            self.context.gate.record_failure();
        }
    }
}

/// Where browser `id` starts in a list of `len` URLs, spreading users
/// evenly over the list.
#[must_use]
pub fn start_offset(id: usize, len: usize, concurrency: usize) -> usize {
    if len == 0 {
        return 0;
    }
    id.saturating_mul(len)
        .checked_div(concurrency.max(1))
        .unwrap_or(0)
        .checked_rem(len)
        .unwrap_or(0)
}
