//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod parsers;
mod types;


pub use cli::TesterArgs;
pub use types::{PositiveU64, PositiveUsize};

pub(crate) use parsers::{parse_cookie, parse_credentials, parse_duration_arg, parse_header, parse_proxy};
