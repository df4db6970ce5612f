
use std::fs;
use std::process::Output;

use tempfile::tempdir;

use support_single::{run_volley, spawn_http_server};

fn describe(output: &Output) -> String {
    format!(
        "status: {:?}\nstdout: {}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn e2e_json_report_counts_every_hit() -> Result<(), String> {
    let (url, server) = spawn_http_server(200)?;

    let output = run_volley(["-c", "2", "-r", "3", "-b", "-j", url.as_str()])?;
    if !output.status.success() {
        return Err(describe(&output));
    }
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|err| format!("invalid JSON report: {}\n{}", err, describe(&output)))?;
    if report.get("transactions").and_then(serde_json::Value::as_u64) != Some(6) {
        return Err(format!("Unexpected report {}", report));
    }
    if report.get("failed_transactions").and_then(serde_json::Value::as_u64) != Some(0) {
        return Err(format!("Unexpected failures {}", report));
    }
    if report.get("availability_x100").and_then(serde_json::Value::as_u64) != Some(10_000) {
        return Err(format!("Unexpected availability {}", report));
    }
    if server.requests() != 6 {
        return Err(format!("Server saw {} requests", server.requests()));
    }
    Ok(())
}

#[test]
fn e2e_text_summary_and_log_file() -> Result<(), String> {
    let (url, _server) = spawn_http_server(200)?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let log = dir.path().join("volley.log");
    let log_arg = log.to_string_lossy().into_owned();

    let output = run_volley([
        "-c",
        "1",
        "-r",
        "2",
        "-b",
        "-l",
        log_arg.as_str(),
        "-m",
        "baseline",
        url.as_str(),
    ])?;
    if !output.status.success() {
        return Err(describe(&output));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("Transactions:") || !stdout.contains("2 hits") {
        return Err(describe(&output));
    }

    let contents = fs::read_to_string(&log).map_err(|err| format!("read log failed: {}", err))?;
    let lines: Vec<&str> = contents.lines().collect();
    if lines.len() != 3 || lines.get(1) != Some(&"**** baseline ****") {
        return Err(format!("Unexpected log file {:?}", lines));
    }
    Ok(())
}

#[test]
fn e2e_probe_prints_response_head() -> Result<(), String> {
    let (url, server) = spawn_http_server(200)?;

    let output = run_volley(["-g", url.as_str()])?;
    if !output.status.success() {
        return Err(describe(&output));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.starts_with("HTTP/1.1 200 Test") || !stdout.contains("Content-Length: 5") {
        return Err(describe(&output));
    }
    if server.requests() != 1 {
        return Err(format!("Probe sent {} requests", server.requests()));
    }
    Ok(())
}

#[test]
fn e2e_failure_threshold_aborts_with_error_status() -> Result<(), String> {
    let (url, _server) = spawn_http_server(500)?;

    let output = run_volley(["-c", "2", "-b", "-q", "--failures", "4", url.as_str()])?;
    if output.status.success() {
        return Err(format!("Expected a failing exit\n{}", describe(&output)));
    }
    Ok(())
}

#[test]
fn e2e_reps_and_time_conflict() -> Result<(), String> {
    let output = run_volley(["-r", "1", "-t", "1s", "http://127.0.0.1:9/"])?;
    if output.status.success() {
        return Err(format!("Expected a failing exit\n{}", describe(&output)));
    }
    Ok(())
}
