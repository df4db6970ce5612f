use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use super::response::ResponseHead;

/// Freshness information captured from one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

impl Validators {
    /// Reads `ETag`, `Last-Modified`, `Cache-Control: max-age` and
    /// `Expires`. `max-age` wins over `Expires`; `no-store`/`no-cache` leave
    /// the entry without an expiry so it is always revalidated.
    #[must_use]
    pub fn from_head(head: &ResponseHead, now: DateTime<Utc>) -> Self {
        let mut validators = Self {
            etag: head.header("etag").map(str::to_owned),
            last_modified: head.header("last-modified").map(str::to_owned),
            expires: None,
        };
        let mut no_cache = false;
        let mut max_age = None;
        for directive in head
            .header_all("cache-control")
            .flat_map(|value| value.split(','))
        {
            let directive = directive.trim().to_ascii_lowercase();
            if directive == "no-cache" || directive == "no-store" {
                no_cache = true;
            } else if let Some(seconds) = directive.strip_prefix("max-age=") {
                max_age = seconds.trim().parse::<i64>().ok();
            }
        }
        if no_cache {
            return validators;
        }
        validators.expires = match max_age {
            Some(seconds) => {
                ChronoDuration::try_seconds(seconds).and_then(|age| now.checked_add_signed(age))
            }
            None => head.header("expires").and_then(parse_http_date),
        };
        validators
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none() && self.expires.is_none()
    }
}

/// Parses an IMF-fixdate such as `Sun, 06 Nov 1994 08:49:37 GMT`.
#[must_use]
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// One simulated user's private cache of validators, keyed by URL.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, Validators>,
}

impl CacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: &str, validators: Validators) {
        if validators.is_empty() {
            self.entries.remove(url);
        } else {
            self.entries.insert(url.to_owned(), validators);
        }
    }

    /// A URL is valid while its recorded expiry lies in the future.
    #[must_use]
    pub fn is_valid(&self, url: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(url)
            .and_then(|entry| entry.expires)
            .is_some_and(|expires| expires > now)
    }

    /// Conditional request headers for revalidating `url`.
    #[must_use]
    pub fn conditional_headers(&self, url: &str) -> Vec<(&'static str, String)> {
        let Some(entry) = self.entries.get(url) else {
            return Vec::new();
        };
        let mut headers = Vec::with_capacity(2);
        if let Some(etag) = &entry.etag {
            headers.push(("If-None-Match", etag.clone()));
        }
        if let Some(modified) = &entry.last_modified {
            headers.push(("If-Modified-Since", modified.clone()));
        }
        headers
    }
}
