mod app;
mod args;
mod browser;
mod config;
mod crew;
mod entry;
mod error;
mod ftp;
mod http;
mod metrics;
mod system;
#[cfg(test)]
mod test_support;
mod transport;
mod urls;

use error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
