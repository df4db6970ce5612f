use std::time::Duration;

use serde::Serialize;

use super::marks::Marks;
use super::stats::BrowserStats;

const MEGABYTE: u128 = 1024 * 1024;

/// Run-level statistics. Ratios are fixed point with two decimals: a
/// `_x100` field of 9_950 reads as 99.50.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub transactions: u64,
    pub availability_x100: u64,
    pub elapsed_ms: u64,
    pub data_bytes: u64,
    pub response_time_ms_x100: u64,
    pub transaction_rate_x100: u64,
    pub throughput_mb_x100: u64,
    pub concurrency_x100: u64,
    pub successful_transactions: u64,
    pub failed_transactions: u64,
    pub longest_ms_x100: u64,
    pub shortest_ms_x100: u64,
}

/// Sums per-user counters into a [`RunReport`] for a run that lasted
/// `elapsed`.
#[must_use]
pub fn aggregate(stats: &[BrowserStats], marks: &Marks, elapsed: Duration) -> RunReport {
    let mut hits: u64 = 0;
    let mut bytes: u64 = 0;
    let mut busy = Duration::ZERO;
    let mut successes: u64 = 0;
    let mut failures: u64 = 0;
    let mut high = marks.high();
    let mut low = marks.low();
    for browser in stats {
        hits = hits.saturating_add(browser.hits);
        bytes = bytes.saturating_add(browser.bytes);
        busy = busy.saturating_add(browser.elapsed);
        successes = successes.saturating_add(browser.successes);
        failures = failures.saturating_add(browser.failures);
        high = high.max(browser.high);
        low = match (low, browser.low) {
            (Some(current), Some(other)) => Some(current.min(other)),
            (current, other) => current.or(other),
        };
    }

    let elapsed_us = elapsed.as_micros().max(1);
    let busy_us = busy.as_micros();
    let completed = u128::from(successes).saturating_add(u128::from(failures));
    RunReport {
        transactions: hits,
        availability_x100: ratio_x100(u128::from(successes).saturating_mul(100), completed),
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        data_bytes: bytes,
        response_time_ms_x100: ratio_x100(busy_us, u128::from(hits).saturating_mul(1_000)),
        transaction_rate_x100: ratio_x100(u128::from(hits).saturating_mul(1_000_000), elapsed_us),
        throughput_mb_x100: ratio_x100(
            u128::from(bytes).saturating_mul(1_000_000),
            elapsed_us.saturating_mul(MEGABYTE),
        ),
        concurrency_x100: ratio_x100(busy_us, elapsed_us),
        successful_transactions: successes,
        failed_transactions: failures,
        longest_ms_x100: ratio_x100(high.as_micros(), 1_000),
        shortest_ms_x100: low.map_or(0, |low| ratio_x100(low.as_micros(), 1_000)),
    }
}

/// `numerator / denominator` scaled by 100, zero when the denominator is.
fn ratio_x100(numerator: u128, denominator: u128) -> u64 {
    numerator
        .saturating_mul(100)
        .checked_div(denominator)
        .map_or(0, |value| u64::try_from(value).unwrap_or(u64::MAX))
}

/// Renders a `_x100` value with two decimals.
#[must_use]
pub fn fixed2(value: u64) -> String {
    format!("{}.{:02}", value / 100, value % 100)
}
