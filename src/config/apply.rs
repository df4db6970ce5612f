use std::path::PathBuf;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{
    PositiveU64, PositiveUsize, TesterArgs, parse_cookie, parse_credentials, parse_header,
    parse_proxy,
};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::types::{ConfigFile, DurationValue};

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn invalid(field: &'static str) -> impl Fn(ValidationError) -> AppError {
    move |source| AppError::config(ConfigError::InvalidEntry { field, source })
}

fn duration(value: &DurationValue, field: &'static str) -> AppResult<std::time::Duration> {
    value.to_duration().map_err(invalid(field))
}

fn positive_field<T, V>(value: V, field: &'static str) -> AppResult<T>
where
    T: TryFrom<V, Error = ValidationError>,
{
    T::try_from(value).map_err(invalid(field))
}

fn parse_all<T>(
    values: &[String],
    parse: fn(&str) -> Result<T, ValidationError>,
    field: &'static str,
) -> AppResult<Vec<T>> {
    values
        .iter()
        .map(|value| parse(value).map_err(invalid(field)))
        .collect()
}

/// Applies configuration values to CLI arguments. A value given on the
/// command line always wins.
///
/// # Errors
///
/// Returns an error when a config value is invalid.
pub fn apply_config(
    args: &mut TesterArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "url")
        && let Some(url) = config.url.clone()
    {
        args.url = Some(url);
    }
    if !is_cli(matches, "file")
        && let Some(file) = config.file.as_ref()
    {
        args.file = Some(PathBuf::from(file));
    }
    if !is_cli(matches, "concurrent")
        && let Some(concurrent) = config.concurrent
    {
        args.concurrent = positive_field::<PositiveUsize, _>(concurrent, "concurrent")?;
    }
    if !is_cli(matches, "reps")
        && let Some(reps) = config.reps
    {
        args.reps = Some(positive_field::<PositiveU64, _>(reps, "reps")?);
    }
    if !is_cli(matches, "time")
        && let Some(time) = config.time.as_ref()
    {
        args.time = Some(duration(time, "time")?);
    }
    if !is_cli(matches, "delay")
        && let Some(delay) = config.delay.as_ref()
    {
        args.delay = Some(duration(delay, "delay")?);
    }
    if !is_cli(matches, "benchmark")
        && let Some(benchmark) = config.benchmark
    {
        args.benchmark = benchmark;
    }
    if !is_cli(matches, "internet")
        && let Some(internet) = config.internet
    {
        args.internet = internet;
    }
    if !is_cli(matches, "headers")
        && let Some(headers) = config.headers.as_ref()
    {
        args.headers = parse_all(headers, parse_header, "headers")?;
    }
    if !is_cli(matches, "user_agent")
        && let Some(agent) = config.user_agent.clone()
    {
        args.user_agent = Some(agent);
    }
    if !is_cli(matches, "log_file")
        && let Some(log) = config.log.as_ref()
    {
        args.log_file = Some(PathBuf::from(log));
    }
    if !is_cli(matches, "mark")
        && let Some(mark) = config.mark.clone()
    {
        args.mark = Some(mark);
    }
    if !is_cli(matches, "login_url")
        && let Some(login) = config.login_url.clone()
    {
        args.login_url = Some(login);
    }
    if !is_cli(matches, "json_output")
        && let Some(json) = config.json_output
    {
        args.json_output = json;
    }
    if !is_cli(matches, "no_follow")
        && let Some(follow) = config.follow_redirects
    {
        args.no_follow = !follow;
    }
    if !is_cli(matches, "max_redirects")
        && let Some(max) = config.max_redirects
    {
        args.max_redirects = max;
    }
    if !is_cli(matches, "bids")
        && let Some(bids) = config.bids
    {
        if bids == 0 {
            return Err(invalid("bids")(ValidationError::ValueTooSmall { min: 1 }));
        }
        args.bids = bids;
    }
    if !is_cli(matches, "no_keepalive")
        && let Some(keepalive) = config.keepalive
    {
        args.no_keepalive = !keepalive;
    }
    if !is_cli(matches, "cache")
        && let Some(cache) = config.cache
    {
        args.cache = cache;
    }
    if !is_cli(matches, "parser")
        && let Some(parser) = config.parser
    {
        args.parser = parser;
    }
    if !is_cli(matches, "no_gzip")
        && let Some(gzip) = config.gzip
    {
        args.no_gzip = !gzip;
    }
    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = duration(timeout, "connect_timeout")?;
    }
    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.timeout = duration(timeout, "timeout")?;
    }
    if !is_cli(matches, "ssl_timeout")
        && let Some(timeout) = config.ssl_timeout.as_ref()
    {
        args.ssl_timeout = duration(timeout, "ssl_timeout")?;
    }
    if !is_cli(matches, "failures")
        && let Some(failures) = config.failures
    {
        args.failures = failures;
    }
    if !is_cli(matches, "expire_session")
        && let Some(expire) = config.expire_session
    {
        args.expire_session = expire;
    }
    if !is_cli(matches, "auth")
        && let Some(auth) = config.auth.as_ref()
    {
        args.auth = parse_all(auth, parse_credentials, "auth")?;
    }
    if !is_cli(matches, "proxy")
        && let Some(proxy) = config.proxy.as_deref()
    {
        args.proxy = Some(parse_proxy(proxy).map_err(invalid("proxy"))?);
    }
    if !is_cli(matches, "proxy_auth")
        && let Some(auth) = config.proxy_auth.as_deref()
    {
        args.proxy_auth = Some(parse_credentials(auth).map_err(invalid("proxy_auth"))?);
    }
    if !is_cli(matches, "cookies")
        && let Some(cookies) = config.cookies.as_ref()
    {
        args.cookies = parse_all(cookies, parse_cookie, "cookies")?;
    }
    if !is_cli(matches, "ftp_active")
        && let Some(active) = config.ftp_active
    {
        args.ftp_active = active;
    }
    if !is_cli(matches, "insecure")
        && let Some(insecure) = config.insecure
    {
        args.insecure = insecure;
    }
    if !is_cli(matches, "allow_zero_data")
        && let Some(allow) = config.allow_zero_data
    {
        args.allow_zero_data = allow;
    }
    if !is_cli(matches, "limit")
        && let Some(limit) = config.limit
    {
        args.limit = limit;
    }
    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }
    if !is_cli(matches, "quiet")
        && let Some(quiet) = config.quiet
    {
        args.quiet = quiet;
    }

    Ok(())
}
