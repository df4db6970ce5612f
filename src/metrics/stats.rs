use std::time::Duration;

/// Counters owned by one simulated user. Read only after the crew joins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrowserStats {
    /// Transactions that produced a response, cached ones included.
    pub hits: u64,
    pub bytes: u64,
    /// Summed elapsed time of every hit.
    pub elapsed: Duration,
    pub successes: u64,
    pub failures: u64,
    pub high: Duration,
    pub low: Option<Duration>,
}

impl BrowserStats {
    pub fn record(&mut self, hit: bool, success: bool, bytes: u64, elapsed: Duration) {
        if success {
            self.successes = self.successes.saturating_add(1);
        } else {
            self.failures = self.failures.saturating_add(1);
        }
        self.bytes = self.bytes.saturating_add(bytes);
        if !hit {
            return;
        }
        self.hits = self.hits.saturating_add(1);
        self.elapsed = self.elapsed.saturating_add(elapsed);
        self.high = self.high.max(elapsed);
        self.low = Some(self.low.map_or(elapsed, |low| low.min(elapsed)));
    }
}
