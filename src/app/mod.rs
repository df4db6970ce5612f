//! Top-level run orchestration: target loading, the optional probe, the
//! load run, and reporting.
mod load;
mod log_file;
mod probe;


use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::args::TesterArgs;
use crate::config::RunSettings;
use crate::error::{AppError, AppResult, UrlError};
use crate::system::summary::print_summary;
use crate::urls::{self, UrlEntry};

use load::run_load;
use log_file::append_log;
use probe::run_probe;

/// Runs the whole program for already merged arguments. Blocks the calling
/// thread, which must not be a runtime worker.
pub(crate) fn run(args: &TesterArgs, runtime: &Runtime) -> AppResult<()> {
    let settings = Arc::new(RunSettings::from_args(args)?);
    let targets = load_targets(args)?;

    if args.get {
        let first = targets.first().ok_or(UrlError::NoUrls)?;
        let lines = runtime.block_on(run_probe(&settings, first))?;
        for line in lines {
            println!("{}", line);
        }
        return Ok(());
    }

    let result = run_load(&settings, Arc::from(targets), runtime.handle())?;

    if settings.report.json {
        println!("{}", serde_json::to_string_pretty(&result.report)?);
    } else if !settings.report.quiet {
        print_summary(&result.report);
    }
    if let Some(path) = settings.report.log_file.as_deref() {
        append_log(
            path,
            settings.report.mark.as_deref(),
            &result.report,
            &chrono::Local::now(),
        )?;
    }

    if result.tripped {
        return Err(AppError::ExcessiveFailures {
            failures: result.failures,
            threshold: settings.failure_threshold,
        });
    }
    Ok(())
}

/// Reads the URL file when given, otherwise the positional URL.
pub(crate) fn load_targets(args: &TesterArgs) -> AppResult<Vec<UrlEntry>> {
    if let Some(path) = args.file.as_deref() {
        return Ok(urls::load_file(path)?);
    }
    let line = args.url.as_deref().ok_or(UrlError::NoUrls)?;
    let entry = urls::parse_line(line, 1)?.ok_or(UrlError::NoUrls)?;
    Ok(vec![entry])
}
