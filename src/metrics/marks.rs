use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Longest and shortest transaction seen by any user, in microseconds.
#[derive(Debug)]
pub struct Marks {
    high_us: AtomicU64,
    low_us: AtomicU64,
}

impl Default for Marks {
    fn default() -> Self {
        Self::new()
    }
}

impl Marks {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            high_us: AtomicU64::new(0),
            low_us: AtomicU64::new(u64::MAX),
        }
    }

    pub fn record(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.high_us.fetch_max(micros, Ordering::Relaxed);
        self.low_us.fetch_min(micros, Ordering::Relaxed);
    }

    #[must_use]
    pub fn high(&self) -> Duration {
        Duration::from_micros(self.high_us.load(Ordering::Relaxed))
    }

    /// `None` until a transaction has been recorded.
    #[must_use]
    pub fn low(&self) -> Option<Duration> {
        match self.low_us.load(Ordering::Relaxed) {
            u64::MAX => None,
            micros => Some(Duration::from_micros(micros)),
        }
    }
}
