//! Configuration loading, merging, and the run settings snapshot.
pub(crate) mod apply;
mod loader;
mod settings;
pub mod types;

#[cfg(test)]
mod tests;

pub use apply::apply_config;
pub use loader::{DEFAULT_CONFIG_FILES, load_config};
pub use settings::{
    DEFAULT_BIDS, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_FAILURE_THRESHOLD, DEFAULT_MAX_REDIRECTS,
    DEFAULT_USER_AGENT, ProxySettings, ReportSettings, RunSettings,
};

#[cfg(test)]
pub(crate) use loader::load_config_file;
