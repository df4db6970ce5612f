use std::path::PathBuf;
use std::time::Duration;

use crate::args::TesterArgs;
use crate::error::{AppError, AppResult, ValidationError};
use crate::http::Credentials;
use crate::transport::{DEFAULT_BUFFER_CAPACITY, SocketOptions};
use crate::urls::UrlEntry;

pub const DEFAULT_USER_AGENT: &str = concat!("volley/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;
pub const DEFAULT_BIDS: u32 = 3;
pub const DEFAULT_FAILURE_THRESHOLD: u64 = 1024;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
}

/// Where and how the run is reported.
#[derive(Debug, Clone, Default)]
pub struct ReportSettings {
    pub quiet: bool,
    pub json: bool,
    pub log_file: Option<PathBuf>,
    pub mark: Option<String>,
}

/// Read-only snapshot of everything a simulated user needs. Built once from
/// the merged CLI and config file, then shared as `Arc<RunSettings>`.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub concurrency: usize,
    /// Iterations per user; `None` runs until the duration or a signal.
    pub reps: Option<u64>,
    pub duration: Option<Duration>,
    /// Upper bound of the random pause between requests; zero disables it.
    pub delay: Duration,
    pub internet: bool,
    pub login: Option<UrlEntry>,
    pub expire_session: bool,
    pub headers: Vec<(String, String)>,
    pub user_agent: String,
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub bids: u32,
    pub keep_alive: bool,
    pub cache: bool,
    pub parser: bool,
    pub gzip: bool,
    pub socket: SocketOptions,
    pub failure_threshold: u64,
    pub credentials: Vec<Credentials>,
    pub proxy: Option<ProxySettings>,
    pub cookies: Vec<(String, String)>,
    pub ftp_passive: bool,
    pub allow_zero_data: bool,
    pub insecure: bool,
    pub report: ReportSettings,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            reps: Some(1),
            duration: None,
            delay: Duration::ZERO,
            internet: false,
            login: None,
            expire_session: false,
            headers: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            bids: DEFAULT_BIDS,
            keep_alive: true,
            cache: false,
            parser: false,
            gzip: true,
            socket: SocketOptions::default(),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            credentials: Vec::new(),
            proxy: None,
            cookies: Vec::new(),
            ftp_passive: true,
            allow_zero_data: true,
            insecure: false,
            report: ReportSettings::default(),
        }
    }
}

impl RunSettings {
    /// Builds the run snapshot from merged arguments.
    ///
    /// # Errors
    ///
    /// Returns an error when the arguments conflict or exceed the
    /// concurrency limit, or when the login URL is invalid.
    pub fn from_args(args: &TesterArgs) -> AppResult<Self> {
        let concurrency = args.concurrent.get();
        if concurrency > args.limit {
            return Err(AppError::validation(ValidationError::ConcurrencyOverLimit {
                concurrency,
                limit: args.limit,
            }));
        }
        if args.reps.is_some() && args.time.is_some() {
            return Err(AppError::validation(ValidationError::RepsAndTimeConflict));
        }

        let delay = if args.benchmark {
            Duration::ZERO
        } else {
            args.delay.unwrap_or(Duration::ZERO)
        };

        let login = args.login_url.as_deref().map(UrlEntry::get).transpose()?;

        let proxy = args.proxy.clone().map(|proxy| ProxySettings {
            credentials: args.proxy_auth.clone(),
            ..proxy
        });

        Ok(Self {
            concurrency,
            reps: args.reps.map(|reps| reps.get()),
            duration: args.time,
            delay,
            internet: args.internet,
            login,
            expire_session: args.expire_session,
            headers: args.headers.clone(),
            user_agent: args
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            follow_redirects: !args.no_follow,
            max_redirects: args.max_redirects,
            bids: args.bids,
            keep_alive: !args.no_keepalive,
            cache: args.cache,
            parser: args.parser,
            gzip: !args.no_gzip,
            socket: SocketOptions {
                connect_timeout: args.connect_timeout,
                io_timeout: args.timeout,
                tls_timeout: args.ssl_timeout,
                buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            },
            failure_threshold: args.failures,
            credentials: args.auth.clone(),
            proxy,
            cookies: args.cookies.clone(),
            ftp_passive: !args.ftp_active,
            allow_zero_data: args.allow_zero_data,
            insecure: args.insecure,
            report: ReportSettings {
                quiet: args.quiet,
                json: args.json_output,
                log_file: args.log_file.clone(),
                mark: args.mark.clone(),
            },
        })
    }
}
