use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Run-wide failure counter. Crossing the threshold cancels the run once.
#[derive(Debug)]
pub struct FailureGate {
    failures: AtomicU64,
    threshold: u64,
    tripped: AtomicBool,
    cancel: CancellationToken,
}

impl FailureGate {
    /// A zero `threshold` never trips.
    #[must_use]
    pub const fn new(threshold: u64, cancel: CancellationToken) -> Self {
        Self {
            failures: AtomicU64::new(0),
            threshold,
            tripped: AtomicBool::new(false),
            cancel,
        }
    }

    /// Counts one failed transaction. Returns `true` for the call that
    /// trips the gate.
    pub fn record_failure(&self) -> bool {
        let total = self.failures.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        if self.threshold == 0 || total < self.threshold {
            return false;
        }
        if self.tripped.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::error!(
            "excessive socket failure: {} failed transactions (threshold {})",
            total,
            self.threshold
        );
        self.cancel.cancel();
        true
    }

    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }
}
