use regex::Regex;
use url::Url;

use crate::error::ValidationError;

/// Sub-resources and the `<meta refresh>` target found in one page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractedLinks {
    pub resources: Vec<Url>,
    pub refresh: Option<Url>,
}

/// Pulls embedded resource URLs out of HTML with a handful of patterns.
/// It is not an HTML parser; it only needs to find what a browser would
/// fetch alongside the page.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    src: Regex,
    stylesheet: Regex,
    refresh: Regex,
}

impl LinkExtractor {
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> Result<Self, ValidationError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|err| ValidationError::LinkPattern { source: err })
        };
        Ok(Self {
            src: compile(
                r#"(?is)<(?:img|script|embed|iframe|frame|input|source)\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#,
            )?,
            stylesheet: compile(
                r#"(?is)<link\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#,
            )?,
            refresh: compile(
                r#"(?is)<meta\b[^>]*?http-equiv\s*=\s*["']?refresh["']?[^>]*?content\s*=\s*["']\s*\d*\s*;?\s*url\s*=\s*([^"'>\s]+)"#,
            )?,
        })
    }

    /// Extracts links from `html`, resolving them against `base`. Only
    /// http(s) targets are kept, each at most once.
    #[must_use]
    pub fn extract(&self, html: &str, base: &Url) -> ExtractedLinks {
        let mut resources: Vec<Url> = Vec::new();
        for pattern in [&self.src, &self.stylesheet] {
            for captures in pattern.captures_iter(html) {
                let Some(raw) = captures
                    .get(1)
                    .or_else(|| captures.get(2))
                    .or_else(|| captures.get(3))
                else {
                    continue;
                };
                if let Some(url) = resolve(base, raw.as_str())
                    && !resources.contains(&url)
                    && url != *base
                {
                    resources.push(url);
                }
            }
        }
        let refresh = self
            .refresh
            .captures(html)
            .and_then(|captures| captures.get(1))
            .and_then(|raw| resolve(base, raw.as_str()));
        ExtractedLinks { resources, refresh }
    }
}

fn resolve(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || raw.starts_with("data:") {
        return None;
    }
    let mut url = base.join(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
