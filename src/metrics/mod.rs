//! Per-user counters, the shared marks and failure gate, and the run-level
//! aggregate computed after the crew drains.
mod gate;
mod marks;
mod report;
mod stats;

#[cfg(test)]
mod tests;

pub use gate::FailureGate;
pub use marks::Marks;
pub use report::{RunReport, aggregate, fixed2};
pub use stats::BrowserStats;
