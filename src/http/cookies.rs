use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use super::cache::parse_http_date;

/// Who may see a cookie. Persistent cookies come from configuration and are
/// sent by every simulated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CookieOwner {
    Persistent,
    Browser(usize),
}

#[derive(Debug, Clone)]
struct Cookie {
    name: String,
    value: String,
    /// Lowercase, without a leading dot. Empty matches every host.
    domain: String,
    host_only: bool,
    path: String,
    expires: Option<DateTime<Utc>>,
    owner: CookieOwner,
}

impl Cookie {
    fn matches_host(&self, host: &str) -> bool {
        if self.domain.is_empty() {
            return true;
        }
        if host.eq_ignore_ascii_case(&self.domain) {
            return true;
        }
        !self.host_only
            && host.len() > self.domain.len()
            && host.to_ascii_lowercase().ends_with(&format!(".{}", self.domain))
    }

    fn matches_path(&self, path: &str) -> bool {
        if self.path == "/" || path == self.path {
            return true;
        }
        path.strip_prefix(self.path.as_str())
            .is_some_and(|rest| self.path.ends_with('/') || rest.starts_with('/'))
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    fn same_slot(&self, other: &Cookie) -> bool {
        self.owner == other.owner
            && self.name == other.name
            && self.domain == other.domain
            && self.path == other.path
    }
}

/// Cookie store shared by every simulated user; entries are tagged with
/// their owner.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<Cookie>>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Cookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a cookie sent by every user to every host.
    pub fn seed(&self, name: &str, value: &str) {
        let cookie = Cookie {
            name: name.to_owned(),
            value: value.to_owned(),
            domain: String::new(),
            host_only: false,
            path: "/".to_owned(),
            expires: None,
            owner: CookieOwner::Persistent,
        };
        let mut cookies = self.lock();
        cookies.retain(|existing| !existing.same_slot(&cookie));
        cookies.push(cookie);
    }

    /// Stores one `Set-Cookie` value received from `host`.
    pub fn ingest(&self, set_cookie: &str, host: &str, owner: CookieOwner, now: DateTime<Utc>) {
        let mut parts = set_cookie.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let mut cookie = Cookie {
            name: name.to_owned(),
            value: value.trim().trim_matches('"').to_owned(),
            domain: host.to_ascii_lowercase(),
            host_only: true,
            path: "/".to_owned(),
            expires: None,
            owner,
        };
        let mut max_age = None;
        for attribute in parts {
            let (key, value) = attribute.split_once('=').unwrap_or((attribute, ""));
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" if !value.is_empty() => {
                    cookie.domain = value.trim_start_matches('.').to_ascii_lowercase();
                    cookie.host_only = false;
                }
                "path" if value.starts_with('/') => cookie.path = value.to_owned(),
                "max-age" => max_age = value.parse::<i64>().ok(),
                "expires" => cookie.expires = parse_http_date(value),
                _ => {}
            }
        }
        if let Some(seconds) = max_age {
            cookie.expires = if seconds <= 0 {
                Some(now)
            } else {
                ChronoDuration::try_seconds(seconds).and_then(|age| now.checked_add_signed(age))
            };
        }
        if !cookie.matches_host(host) {
            return;
        }

        let mut cookies = self.lock();
        cookies.retain(|existing| !existing.same_slot(&cookie));
        if !cookie.is_expired(now) {
            cookies.push(cookie);
        }
    }

    /// `Cookie` header value for a request by `owner` to `host` and `path`.
    #[must_use]
    pub fn header_for(
        &self,
        host: &str,
        path: &str,
        owner: CookieOwner,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let mut cookies = self.lock();
        cookies.retain(|cookie| !cookie.is_expired(now));
        let pairs: Vec<String> = cookies
            .iter()
            .filter(|cookie| cookie.owner == owner || cookie.owner == CookieOwner::Persistent)
            .filter(|cookie| cookie.matches_host(host) && cookie.matches_path(path))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Drops every cookie owned by `owner`; persistent cookies survive.
    pub fn clear_owner(&self, owner: CookieOwner) {
        if owner == CookieOwner::Persistent {
            return;
        }
        self.lock().retain(|cookie| cookie.owner != owner);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies_are_scoped_to_their_owner() -> Result<(), String> {
        let jar = CookieJar::new();
        let now = Utc::now();
        jar.seed("tenant", "acme");
        jar.ingest("session=a1; Path=/", "shop.local", CookieOwner::Browser(0), now);
        jar.ingest("session=b2; Path=/", "shop.local", CookieOwner::Browser(1), now);

        let first = jar.header_for("shop.local", "/cart", CookieOwner::Browser(0), now);
        if first.as_deref() != Some("tenant=acme; session=a1") {
            return Err(format!("Unexpected header for user 0: {:?}", first));
        }
        jar.clear_owner(CookieOwner::Browser(0));
        let cleared = jar.header_for("shop.local", "/", CookieOwner::Browser(0), now);
        if cleared.as_deref() != Some("tenant=acme") {
            return Err(format!("Unexpected header after clear: {:?}", cleared));
        }
        let second = jar.header_for("shop.local", "/", CookieOwner::Browser(1), now);
        if second.as_deref() != Some("tenant=acme; session=b2") {
            return Err(format!("Other owner lost its cookie: {:?}", second));
        }
        Ok(())
    }

    #[test]
    fn domain_and_path_matching() -> Result<(), String> {
        let jar = CookieJar::new();
        let now = Utc::now();
        let owner = CookieOwner::Browser(3);
        jar.ingest("wide=1; Domain=.example.com", "www.example.com", owner, now);
        jar.ingest("narrow=2; Path=/admin", "www.example.com", owner, now);

        let sub = jar.header_for("api.example.com", "/", owner, now);
        if sub.as_deref() != Some("wide=1") {
            return Err(format!("Domain cookie not shared with subdomain: {:?}", sub));
        }
        let admin = jar.header_for("www.example.com", "/admin/users", owner, now);
        if admin.as_deref() != Some("wide=1; narrow=2") {
            return Err(format!("Path cookie missing: {:?}", admin));
        }
        let other = jar.header_for("www.example.com", "/administrator", owner, now);
        if other.as_deref() != Some("wide=1") {
            return Err(format!("Path prefix leaked: {:?}", other));
        }
        Ok(())
    }

    #[test]
    fn max_age_zero_deletes_and_expiry_is_honoured() -> Result<(), String> {
        let jar = CookieJar::new();
        let now = Utc::now();
        let owner = CookieOwner::Browser(0);
        jar.ingest("a=1", "h", owner, now);
        jar.ingest("b=2; Max-Age=5", "h", owner, now);
        jar.ingest("a=gone; Max-Age=0", "h", owner, now);

        let header = jar.header_for("h", "/", owner, now);
        if header.as_deref() != Some("b=2") {
            return Err(format!("Unexpected header: {:?}", header));
        }
        let later = now
            .checked_add_signed(ChronoDuration::seconds(10))
            .ok_or_else(|| "time overflow".to_owned())?;
        if let Some(stale) = jar.header_for("h", "/", owner, later) {
            return Err(format!("Expired cookie sent: {}", stale));
        }
        if !jar.is_empty() {
            return Err(format!("Expired cookies not pruned: {}", jar.len()));
        }
        Ok(())
    }
}
