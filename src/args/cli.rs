use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::config::{
    DEFAULT_BIDS, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_FAILURE_THRESHOLD, DEFAULT_MAX_REDIRECTS,
    ProxySettings,
};
use crate::http::Credentials;

use super::parsers::{
    parse_cookie, parse_credentials, parse_duration_arg, parse_header, parse_positive_u64,
    parse_positive_usize, parse_proxy,
};
use super::types::{PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "HTTP/HTTPS/FTP load tester and benchmark: many simulated users, keep-alive, redirects, auth, and a siege-style summary."
)]
pub struct TesterArgs {
    /// Target URL, optionally followed by a method and body ("URL POST a=1")
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// URL file: one `URL [METHOD] [body | <file]` per line
    #[arg(long = "file", short = 'f')]
    pub file: Option<PathBuf>,

    /// Number of simulated users
    #[arg(
        long = "concurrent",
        short = 'c',
        default_value = "25",
        value_parser = parse_positive_usize
    )]
    pub concurrent: PositiveUsize,

    /// Transactions per user
    #[arg(long = "reps", short = 'r', value_parser = parse_positive_u64)]
    pub reps: Option<PositiveU64>,

    /// Run time (supports ms/s/m/h)
    #[arg(long = "time", short = 't', value_parser = parse_duration_arg)]
    pub time: Option<Duration>,

    /// Upper bound of the random pause between requests (supports ms/s/m/h)
    #[arg(long = "delay", short = 'd', value_parser = parse_duration_arg)]
    pub delay: Option<Duration>,

    /// No pause between requests
    #[arg(long = "benchmark", short = 'b')]
    pub benchmark: bool,

    /// Pick URLs at random instead of in order
    #[arg(long = "internet", short = 'i')]
    pub internet: bool,

    /// Extra request header (repeatable), e.g. 'X-Trace: 1'
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// User-Agent header value
    #[arg(long = "user-agent", short = 'A')]
    pub user_agent: Option<String>,

    /// Fetch the first URL once and print the response head
    #[arg(long = "get", short = 'g')]
    pub get: bool,

    /// Append a CSV line with the results to this file
    #[arg(long = "log", short = 'l')]
    pub log_file: Option<PathBuf>,

    /// Write a marker line into the log file before the results
    #[arg(long = "mark", short = 'm')]
    pub mark: Option<String>,

    /// URL fetched once by every user before its loop
    #[arg(long = "login-url")]
    pub login_url: Option<String>,

    /// Print the summary as JSON
    #[arg(long = "json-output", short = 'j')]
    pub json_output: bool,

    /// Do not follow redirects
    #[arg(long = "no-follow")]
    pub no_follow: bool,

    /// Redirect hops allowed per transaction
    #[arg(long = "max-redirects", default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: u32,

    /// Authentication attempts per realm before giving up
    #[arg(
        long = "bids",
        default_value_t = DEFAULT_BIDS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub bids: u32,

    /// Close the connection after every transaction
    #[arg(long = "no-keepalive")]
    pub no_keepalive: bool,

    /// Honour cache validators for page resources
    #[arg(long = "cache")]
    pub cache: bool,

    /// Fetch images, scripts, and stylesheets embedded in HTML pages
    #[arg(long = "parser")]
    pub parser: bool,

    /// Do not advertise gzip/deflate
    #[arg(long = "no-gzip")]
    pub no_gzip: bool,

    /// Connect timeout (supports ms/s/m/h)
    #[arg(long = "connect-timeout", default_value = "30s", value_parser = parse_duration_arg)]
    pub connect_timeout: Duration,

    /// Socket read/write timeout (supports ms/s/m/h)
    #[arg(long = "timeout", default_value = "30s", value_parser = parse_duration_arg)]
    pub timeout: Duration,

    /// TLS handshake timeout (supports ms/s/m/h)
    #[arg(long = "ssl-timeout", default_value = "30s", value_parser = parse_duration_arg)]
    pub ssl_timeout: Duration,

    /// Failed transactions tolerated before the run aborts (0 disables)
    #[arg(long = "failures", default_value_t = DEFAULT_FAILURE_THRESHOLD)]
    pub failures: u64,

    /// Drop session cookies each time a user wraps around the URL list
    #[arg(long = "expire-session")]
    pub expire_session: bool,

    /// Credentials as user:password[@realm] (repeatable)
    #[arg(long = "auth", value_parser = parse_credentials)]
    pub auth: Vec<Credentials>,

    /// HTTP proxy as host:port
    #[arg(long = "proxy", value_parser = parse_proxy)]
    pub proxy: Option<ProxySettings>,

    /// Proxy credentials as user:password[@realm]
    #[arg(long = "proxy-auth", value_parser = parse_credentials)]
    pub proxy_auth: Option<Credentials>,

    /// Cookie sent to every host as name=value (repeatable)
    #[arg(long = "cookie", value_parser = parse_cookie)]
    pub cookies: Vec<(String, String)>,

    /// Use active (PORT) instead of passive FTP
    #[arg(long = "ftp-active")]
    pub ftp_active: bool,

    /// Accept invalid TLS certificates and host names
    #[arg(long = "insecure", short = 'k')]
    pub insecure: bool,

    /// Whether an empty 200 response counts as a success
    #[arg(long = "allow-zero-data", default_value_t = true, action = ArgAction::Set)]
    pub allow_zero_data: bool,

    /// Largest accepted --concurrent value
    #[arg(long = "limit", default_value_t = DEFAULT_CONCURRENCY_LIMIT)]
    pub limit: usize,

    /// Log every transaction
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Suppress the text summary
    #[arg(long = "quiet", short = 'q')]
    pub quiet: bool,

    /// Disable ANSI colors in log output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Config file (.toml or .json); volley.toml / volley.json are used when present
    #[arg(long = "config")]
    pub config: Option<String>,
}
