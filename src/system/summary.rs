use crate::metrics::{RunReport, fixed2};

const MEGABYTE: u64 = 1024 * 1024;

/// Header written once at the top of a new log file.
pub(crate) const LOG_HEADER: &str = "      Date & Time,  Trans,  Elap Time,  Data Trans,  Resp Time,  Trans Rate,  Throughput,  Concurrent,    OKAY,   Failed";

fn secs_from_ms(ms: u64) -> String {
    fixed2(ms / 10)
}

fn secs_from_ms_x100(ms_x100: u64) -> String {
    fixed2(ms_x100 / 1_000)
}

fn megabytes(bytes: u64) -> String {
    fixed2(bytes.saturating_mul(100) / MEGABYTE)
}

/// Text summary in the classic siege layout.
#[must_use]
pub(crate) fn summary_lines(report: &RunReport) -> Vec<String> {
    vec![
        format!("Transactions:\t\t{:>12} hits", report.transactions),
        format!("Availability:\t\t{:>12} %", fixed2(report.availability_x100)),
        format!("Elapsed time:\t\t{:>12} secs", secs_from_ms(report.elapsed_ms)),
        format!("Data transferred:\t{:>12} MB", megabytes(report.data_bytes)),
        format!(
            "Response time:\t\t{:>12} secs",
            secs_from_ms_x100(report.response_time_ms_x100)
        ),
        format!(
            "Transaction rate:\t{:>12} trans/sec",
            fixed2(report.transaction_rate_x100)
        ),
        format!("Throughput:\t\t{:>12} MB/sec", fixed2(report.throughput_mb_x100)),
        format!("Concurrency:\t\t{:>12}", fixed2(report.concurrency_x100)),
        format!("Successful transactions:{:>12}", report.successful_transactions),
        format!("Failed transactions:\t{:>12}", report.failed_transactions),
        format!(
            "Longest transaction:\t{:>12}",
            secs_from_ms_x100(report.longest_ms_x100)
        ),
        format!(
            "Shortest transaction:\t{:>12}",
            secs_from_ms_x100(report.shortest_ms_x100)
        ),
    ]
}

pub(crate) fn print_summary(report: &RunReport) {
    println!();
    for line in summary_lines(report) {
        println!("{}", line);
    }
    println!();
}

/// One log file row; `timestamp` is already formatted.
#[must_use]
pub(crate) fn log_line(report: &RunReport, timestamp: &str) -> String {
    format!(
        "{},{:>7},{:>11},{:>12},{:>11},{:>12},{:>12},{:>12},{:>8},{:>8}",
        timestamp,
        report.transactions,
        secs_from_ms(report.elapsed_ms),
        megabytes(report.data_bytes),
        secs_from_ms_x100(report.response_time_ms_x100),
        fixed2(report.transaction_rate_x100),
        fixed2(report.throughput_mb_x100),
        fixed2(report.concurrency_x100),
        report.successful_transactions,
        report.failed_transactions
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunReport {
        RunReport {
            transactions: 50,
            availability_x100: 10_000,
            elapsed_ms: 1_234,
            data_bytes: 3 * MEGABYTE / 2,
            response_time_ms_x100: 2_500,
            transaction_rate_x100: 4_052,
            throughput_mb_x100: 121,
            concurrency_x100: 101,
            successful_transactions: 50,
            failed_transactions: 0,
            longest_ms_x100: 12_000,
            shortest_ms_x100: 500,
        }
    }

    #[test]
    fn summary_uses_seconds_and_megabytes() -> Result<(), String> {
        let lines = summary_lines(&sample());
        let expected = [
            ("Transactions:", "50 hits"),
            ("Availability:", "100.00 %"),
            ("Elapsed time:", "1.23 secs"),
            ("Data transferred:", "1.50 MB"),
            ("Response time:", "0.02 secs"),
            ("Transaction rate:", "40.52 trans/sec"),
            ("Longest transaction:", "0.12"),
            ("Shortest transaction:", "0.00"),
        ];
        for (label, value) in expected {
            let line = lines
                .iter()
                .find(|line| line.starts_with(label))
                .ok_or_else(|| format!("Missing line {}", label))?;
            if !line.trim_end().ends_with(value) {
                return Err(format!("Unexpected line {:?}, wanted {:?}", line, value));
            }
        }
        Ok(())
    }

    #[test]
    fn log_line_has_one_column_per_header_field() -> Result<(), String> {
        let line = log_line(&sample(), "2026-10-15 12:00:00");
        let columns = line.split(',').count();
        let header_columns = LOG_HEADER.split(',').count();
        if columns != header_columns {
            return Err(format!("{} columns, header has {}", columns, header_columns));
        }
        if !line.starts_with("2026-10-15 12:00:00,     50,") {
            return Err(format!("Unexpected line {:?}", line));
        }
        Ok(())
    }
}
