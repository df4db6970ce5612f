use super::{RunSettings, apply_config, load_config_file, types::DurationValue};
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use std::time::Duration;
use tempfile::tempdir;

use crate::args::TesterArgs;
use crate::error::{AppError, ValidationError};

fn matches_from(argv: &[&str]) -> Result<(TesterArgs, ArgMatches), String> {
    let matches = TesterArgs::command()
        .try_get_matches_from(argv)
        .map_err(|err| format!("parse args failed: {}", err))?;
    let args = TesterArgs::from_arg_matches(&matches)
        .map_err(|err| format!("parse args failed: {}", err))?;
    Ok((args, matches))
}

#[test]
fn toml_config_fills_unset_arguments() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("volley.toml");
    let content = r#"
url = "http://localhost:3000/"
concurrency = 7
time = "90s"
delay = 2
headers = ["X-Env: staging"]
auth = ["alice:pw@admin"]
proxy = "proxy.local:3128"
proxy_auth = "p:q"
follow_redirects = false
keepalive = false
"#;
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;

    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    let (mut args, matches) = matches_from(&["volley"])?;
    apply_config(&mut args, &matches, &config).map_err(|err| err.to_string())?;

    if args.url.as_deref() != Some("http://localhost:3000/") || args.concurrent.get() != 7 {
        return Err(format!("Unexpected target {:?}", args));
    }
    if args.time != Some(Duration::from_secs(90)) || args.delay != Some(Duration::from_secs(2)) {
        return Err(format!("Unexpected timing {:?} {:?}", args.time, args.delay));
    }
    if args.headers != [("X-Env".to_owned(), "staging".to_owned())] {
        return Err(format!("Unexpected headers {:?}", args.headers));
    }
    if !args.no_follow || !args.no_keepalive {
        return Err("Expected follow and keep-alive to be disabled".to_owned());
    }

    let settings = RunSettings::from_args(&args).map_err(|err| err.to_string())?;
    let proxy = settings
        .proxy
        .as_ref()
        .ok_or_else(|| "Expected proxy".to_owned())?;
    if proxy.port != 3128 || proxy.credentials.as_ref().map(|c| c.user.as_str()) != Some("p") {
        return Err(format!("Unexpected proxy {:?}", proxy));
    }
    if settings.credentials.len() != 1 || settings.keep_alive || settings.follow_redirects {
        return Err(format!("Unexpected settings {:?}", settings));
    }
    Ok(())
}

#[test]
fn json_config_is_accepted() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("volley.json");
    let content = r#"{
  "url": "http://localhost:3000/",
  "reps": 4,
  "json_output": true,
  "failures": 0
}"#;
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;

    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    if config.reps != Some(4) || config.json_output != Some(true) || config.failures != Some(0) {
        return Err(format!("Unexpected config {:?}", config));
    }
    Ok(())
}

#[test]
fn unknown_keys_and_extensions_are_errors() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let toml_path = dir.path().join("bad.toml");
    std::fs::write(&toml_path, "rate = 5\n").map_err(|err| format!("write failed: {}", err))?;
    if load_config_file(&toml_path).is_ok() {
        return Err("Expected unknown key to be rejected".to_owned());
    }

    let yaml_path = dir.path().join("volley.yaml");
    std::fs::write(&yaml_path, "url: x\n").map_err(|err| format!("write failed: {}", err))?;
    if load_config_file(&yaml_path).is_ok() {
        return Err("Expected unsupported extension".to_owned());
    }
    Ok(())
}

#[test]
fn command_line_wins_over_config() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("volley.toml");
    std::fs::write(&path, "url = \"http://from-config/\"\nconcurrent = 9\n")
        .map_err(|err| format!("write failed: {}", err))?;

    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    let (mut args, matches) = matches_from(&["volley", "-c", "3", "http://from-cli/"])?;
    apply_config(&mut args, &matches, &config).map_err(|err| err.to_string())?;

    if args.url.as_deref() != Some("http://from-cli/") || args.concurrent.get() != 3 {
        return Err(format!("Expected CLI values to win {:?}", args));
    }
    Ok(())
}

#[test]
fn invalid_config_values_are_reported() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("volley.toml");
    std::fs::write(&path, "concurrent = 0\n").map_err(|err| format!("write failed: {}", err))?;

    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    let (mut args, matches) = matches_from(&["volley"])?;
    match apply_config(&mut args, &matches, &config) {
        Err(AppError::Config(_)) => Ok(()),
        other => Err(format!("Expected config error, got {:?}", other)),
    }
}

#[test]
fn duration_values_accept_numbers_and_units() -> Result<(), String> {
    let seconds = DurationValue::Seconds(5)
        .to_duration()
        .map_err(|err| err.to_string())?;
    let text = DurationValue::Text("1500ms".to_owned())
        .to_duration()
        .map_err(|err| err.to_string())?;
    if seconds != Duration::from_secs(5) || text != Duration::from_millis(1500) {
        return Err(format!("Unexpected durations {:?} {:?}", seconds, text));
    }
    if DurationValue::Seconds(0).to_duration().is_ok() {
        return Err("Expected zero seconds to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn settings_reject_conflicts_and_limits() -> Result<(), String> {
    let (args, _) = matches_from(&["volley", "-r", "2", "-t", "10s", "http://localhost/"])?;
    match RunSettings::from_args(&args) {
        Err(AppError::Validation(ValidationError::RepsAndTimeConflict)) => {}
        other => return Err(format!("Expected reps/time conflict, got {:?}", other)),
    }

    let (args, _) = matches_from(&["volley", "-c", "300", "http://localhost/"])?;
    match RunSettings::from_args(&args) {
        Err(AppError::Validation(ValidationError::ConcurrencyOverLimit {
            concurrency: 300,
            limit: 255,
        })) => Ok(()),
        other => Err(format!("Expected limit error, got {:?}", other)),
    }
}

#[test]
fn benchmark_zeroes_the_delay() -> Result<(), String> {
    let (args, _) = matches_from(&["volley", "-b", "-d", "3s", "--ftp-active", "http://localhost/"])?;
    let settings = RunSettings::from_args(&args).map_err(|err| err.to_string())?;
    if settings.delay != Duration::ZERO || settings.ftp_passive {
        return Err(format!("Unexpected settings {:?}", settings));
    }
    if settings.reps.is_some() || settings.duration.is_some() {
        return Err("Expected an unbounded run".to_owned());
    }
    Ok(())
}
