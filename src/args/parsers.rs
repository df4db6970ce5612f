use std::time::Duration;

use super::types::{PositiveU64, PositiveUsize};
use crate::config::ProxySettings;
use crate::error::ValidationError;
use crate::http::Credentials;

pub(crate) fn parse_header(s: &str) -> Result<(String, String), ValidationError> {
    match s.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(ValidationError::InvalidHeaderFormat {
            value: s.to_owned(),
        }),
    }
}

pub(super) fn parse_positive_u64(s: &str) -> Result<PositiveU64, ValidationError> {
    s.parse::<PositiveU64>()
}

pub(super) fn parse_positive_usize(s: &str) -> Result<PositiveUsize, ValidationError> {
    s.parse::<PositiveUsize>()
}

/// `user:password` with an optional `@realm` suffix. The password may itself
/// contain `:`; the realm is whatever follows the last `@`.
pub(crate) fn parse_credentials(s: &str) -> Result<Credentials, ValidationError> {
    let invalid = || ValidationError::InvalidCredentials {
        value: s.to_owned(),
    };
    let (pair, realm) = match s.rsplit_once('@') {
        Some((pair, realm)) if !realm.is_empty() => (pair, Some(realm.to_owned())),
        Some(_) => return Err(invalid()),
        None => (s, None),
    };
    let (user, password) = pair.split_once(':').ok_or_else(invalid)?;
    if user.is_empty() {
        return Err(invalid());
    }
    Ok(Credentials {
        user: user.to_owned(),
        password: password.to_owned(),
        realm,
    })
}

/// `host:port`, optionally written as an `http://` URL.
pub(crate) fn parse_proxy(s: &str) -> Result<ProxySettings, ValidationError> {
    let invalid = || ValidationError::InvalidProxy {
        value: s.to_owned(),
    };
    let trimmed = s.trim();
    let authority = trimmed
        .strip_prefix("http://")
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    let (host, port) = authority.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().or_else(|_| Err(invalid()))?;
    if host.is_empty() || port == 0 {
        return Err(invalid());
    }
    Ok(ProxySettings {
        host: host.to_owned(),
        port,
        credentials: None,
    })
}

pub(crate) fn parse_cookie(s: &str) -> Result<(String, String), ValidationError> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(ValidationError::InvalidCookie {
            value: s.to_owned(),
        }),
    }
}

/// Parses `500ms`, `10s`, `5m`, or `1h`. A bare number means seconds.
pub(crate) fn parse_duration_arg(s: &str) -> Result<Duration, ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ValidationError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => {
            let secs = number
                .checked_mul(60)
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        "h" => {
            let secs = number
                .checked_mul(60)
                .and_then(|seconds| seconds.checked_mul(60))
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        _ => {
            return Err(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };

    if duration.as_millis() == 0 {
        return Err(ValidationError::DurationZero);
    }

    Ok(duration)
}
