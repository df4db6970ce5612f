use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, TimeZone};

use crate::error::AppResult;
use crate::metrics::RunReport;
use crate::system::summary::{LOG_HEADER, log_line};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Appends one row for this run, preceded by the header when the file is
/// new and by `mark` when given.
///
/// # Errors
///
/// Returns an error when the file cannot be opened or written.
pub(crate) fn append_log<Tz>(
    path: &Path,
    mark: Option<&str>,
    report: &RunReport,
    now: &DateTime<Tz>,
) -> AppResult<()>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let is_new = !std::fs::metadata(path).is_ok_and(|meta| meta.len() > 0);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut out = String::new();
    if is_new {
        out.push_str(LOG_HEADER);
        out.push('\n');
    }
    if let Some(mark) = mark {
        out.push_str("**** ");
        out.push_str(mark);
        out.push_str(" ****\n");
    }
    out.push_str(&log_line(report, &now.format(TIMESTAMP_FORMAT).to_string()));
    out.push('\n');
    file.write_all(out.as_bytes())?;
    Ok(())
}
