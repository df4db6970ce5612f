use super::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn stats_with(hits: u64, failures: u64, each: Duration) -> BrowserStats {
    let mut stats = BrowserStats::default();
    for _ in 0..hits {
        stats.record(true, true, 100, each);
    }
    for _ in 0..failures {
        stats.record(false, false, 0, Duration::ZERO);
    }
    stats
}

#[test]
fn five_users_ten_reps_all_ok() -> Result<(), String> {
    let marks = Marks::new();
    let stats: Vec<BrowserStats> = (0..5)
        .map(|_| stats_with(10, 0, Duration::from_millis(20)))
        .collect();
    marks.record(Duration::from_millis(20));
    let report = aggregate(&stats, &marks, Duration::from_secs(2));

    if report.transactions != 50 || report.failed_transactions != 0 {
        return Err(format!("Unexpected totals {:?}", report));
    }
    if report.availability_x100 != 10_000 || fixed2(report.availability_x100) != "100.00" {
        return Err(format!("Unexpected availability {}", report.availability_x100));
    }
    // 50 hits over 2s, 20ms each: 25 trans/sec, 1s busy => concurrency 0.50.
    if report.transaction_rate_x100 != 2_500 || report.concurrency_x100 != 50 {
        return Err(format!("Unexpected rates {:?}", report));
    }
    if report.response_time_ms_x100 != 2_000 || report.data_bytes != 5_000 {
        return Err(format!("Unexpected response time or bytes {:?}", report));
    }
    Ok(())
}

#[test]
fn hits_sum_exactly_for_any_worker_count() -> Result<(), String> {
    let marks = Marks::new();
    for workers in 1..=9u64 {
        let stats: Vec<BrowserStats> = (0..workers)
            .map(|id| stats_with(id.saturating_add(3), id % 2, Duration::from_millis(1)))
            .collect();
        let expected: u64 = stats.iter().map(|stats| stats.hits).sum();
        let report = aggregate(&stats, &marks, Duration::from_secs(1));
        if report.transactions != expected {
            return Err(format!("{} workers: {} != {}", workers, report.transactions, expected));
        }
    }
    Ok(())
}

#[test]
fn failures_reduce_availability_but_not_hits() -> Result<(), String> {
    let stats = [stats_with(3, 1, Duration::from_millis(5))];
    let report = aggregate(&stats, &Marks::new(), Duration::from_secs(1));
    if report.transactions != 3 || report.availability_x100 != 7_500 {
        return Err(format!("Unexpected report {:?}", report));
    }
    Ok(())
}

#[test]
fn empty_run_has_zero_ratios() -> Result<(), String> {
    let report = aggregate(&[], &Marks::new(), Duration::ZERO);
    if report != RunReport::default() {
        return Err(format!("Unexpected report {:?}", report));
    }
    Ok(())
}

#[test]
fn marks_track_extremes_across_threads() -> Result<(), String> {
    let marks = Arc::new(Marks::new());
    if marks.low().is_some() {
        return Err("Fresh marks must have no low mark".to_owned());
    }
    let handles: Vec<_> = (1..=8u64)
        .map(|millis| {
            let marks = Arc::clone(&marks);
            thread::spawn(move || marks.record(Duration::from_millis(millis)))
        })
        .collect();
    for handle in handles {
        if handle.join().is_err() {
            return Err("marker thread panicked".to_owned());
        }
    }
    if marks.high() != Duration::from_millis(8) || marks.low() != Some(Duration::from_millis(1)) {
        return Err(format!("Unexpected marks {:?} / {:?}", marks.high(), marks.low()));
    }
    let report = aggregate(&[], &marks, Duration::from_secs(1));
    if report.longest_ms_x100 != 800 || report.shortest_ms_x100 != 100 {
        return Err(format!("Unexpected mark report {:?}", report));
    }
    Ok(())
}

#[test]
fn failure_gate_trips_once_and_cancels() -> Result<(), String> {
    let token = CancellationToken::new();
    let gate = FailureGate::new(3, token.clone());
    let trips: Vec<bool> = (0..5).map(|_| gate.record_failure()).collect();
    if trips != [false, false, true, false, false] {
        return Err(format!("Unexpected trip sequence {:?}", trips));
    }
    if !gate.is_tripped() || !token.is_cancelled() || gate.failures() != 5 {
        return Err("Gate must stay tripped and cancel the run".to_owned());
    }
    Ok(())
}

#[test]
fn zero_threshold_never_trips() -> Result<(), String> {
    let token = CancellationToken::new();
    let gate = FailureGate::new(0, token.clone());
    for _ in 0..2_000 {
        gate.record_failure();
    }
    if gate.is_tripped() || token.is_cancelled() {
        return Err("Disabled gate tripped".to_owned());
    }
    Ok(())
}
