use std::time::Duration;

use serde::Deserialize;

use crate::args::parse_duration_arg;
use crate::error::ValidationError;

/// Contents of `volley.toml` / `volley.json`. Every field is optional and
/// only fills in values not given on the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub file: Option<String>,
    #[serde(alias = "concurrency")]
    pub concurrent: Option<usize>,
    pub reps: Option<u64>,
    pub time: Option<DurationValue>,
    pub delay: Option<DurationValue>,
    pub benchmark: Option<bool>,
    pub internet: Option<bool>,
    pub headers: Option<Vec<String>>,
    pub user_agent: Option<String>,
    pub log: Option<String>,
    pub mark: Option<String>,
    pub login_url: Option<String>,
    pub json_output: Option<bool>,
    pub follow_redirects: Option<bool>,
    pub max_redirects: Option<u32>,
    pub bids: Option<u32>,
    pub keepalive: Option<bool>,
    pub cache: Option<bool>,
    pub parser: Option<bool>,
    pub gzip: Option<bool>,
    pub connect_timeout: Option<DurationValue>,
    pub timeout: Option<DurationValue>,
    pub ssl_timeout: Option<DurationValue>,
    pub failures: Option<u64>,
    pub expire_session: Option<bool>,
    pub auth: Option<Vec<String>>,
    pub proxy: Option<String>,
    pub proxy_auth: Option<String>,
    pub cookies: Option<Vec<String>>,
    pub ftp_active: Option<bool>,
    pub insecure: Option<bool>,
    pub allow_zero_data: Option<bool>,
    pub limit: Option<usize>,
    pub verbose: Option<bool>,
    pub quiet: Option<bool>,
}

/// A duration written either as whole seconds or with a unit suffix.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(0) => Err(ValidationError::DurationZero),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration_arg(text),
        }
    }
}
