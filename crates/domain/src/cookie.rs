//! Cookie types and matching.
//!
//! This module implements the practical cookie subset used by the request
//! executor: `Set-Cookie` parsing, eligibility matching for outgoing
//! requests, and merge semantics for the persisted jar. Full RFC 6265
//! conformance is out of scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A single HTTP cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain the cookie belongs to.
    pub domain: String,
    /// Path the cookie applies to.
    #[serde(default = "default_path")]
    pub path: String,
    /// Expiration time (None for session cookies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag.
    #[serde(default)]
    pub http_only: bool,
    /// SameSite attribute, if the response declared a valid one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
    /// Disabled cookies stay in the jar but are never sent.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_path() -> String {
    "/".to_string()
}

const fn default_enabled() -> bool {
    true
}

impl Cookie {
    /// Creates a new enabled session cookie.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: None,
            secure: false,
            http_only: false,
            same_site: None,
            enabled: true,
        }
    }

    /// Sets the path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the expiration.
    #[must_use]
    pub const fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Sets the Secure flag.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Checks if the cookie is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|exp| exp <= now)
    }

    /// Checks if the cookie is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Checks if the cookie domain matches a request host.
    ///
    /// The cookie domain matches the host itself and any subdomain of it.
    #[must_use]
    pub fn matches_domain(&self, host: &str) -> bool {
        domain_matches(&self.domain, host)
    }

    /// Checks if the cookie path is a prefix of the request path.
    #[must_use]
    pub fn matches_path(&self, path: &str) -> bool {
        path.starts_with(&self.path)
    }

    /// Checks eligibility for a parsed request URL.
    #[must_use]
    pub fn applies_to_url(&self, url: &Url) -> bool {
        if !self.enabled || self.is_expired() {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        self.matches_domain(host) && self.matches_path(url.path())
    }

    /// Formats the cookie as a `name=value` pair for the `Cookie` header.
    #[must_use]
    pub fn to_header_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Parses a `Set-Cookie` header value.
    ///
    /// The first `;`-separated segment must be `name=value`; anything else
    /// yields `None`. Attributes are recognized case-insensitively. A
    /// `Max-Age` attribute is converted to an absolute expiry and overrides
    /// `Expires` when the computed instant is later. An invalid `SameSite`
    /// value is ignored.
    #[must_use]
    pub fn parse_set_cookie(header: &str, default_domain: &str) -> Option<Self> {
        let mut segments = header.split(';');

        let first = segments.next()?;
        let (name, value) = first.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self::new(name, value.trim(), default_domain);
        let now = Utc::now();
        let mut expires_attr: Option<DateTime<Utc>> = None;
        let mut max_age_attr: Option<DateTime<Utc>> = None;

        for segment in segments {
            let segment = segment.trim();
            if let Some((attr, val)) = segment.split_once('=') {
                let val = val.trim();
                match attr.trim().to_ascii_lowercase().as_str() {
                    "domain" => cookie.domain = val.trim_start_matches('.').to_string(),
                    "path" => {
                        if !val.is_empty() {
                            cookie.path = val.to_string();
                        }
                    }
                    "expires" => {
                        if let Ok(exp) = DateTime::parse_from_rfc2822(val) {
                            expires_attr = Some(exp.with_timezone(&Utc));
                        }
                    }
                    "max-age" => {
                        if let Ok(secs) = val.parse::<i64>() {
                            max_age_attr = Some(now + chrono::Duration::seconds(secs));
                        }
                    }
                    "samesite" => {
                        cookie.same_site = match val.to_ascii_lowercase().as_str() {
                            "strict" => Some(SameSite::Strict),
                            "lax" => Some(SameSite::Lax),
                            "none" => Some(SameSite::None),
                            _ => cookie.same_site,
                        };
                    }
                    _ => {}
                }
            } else {
                match segment.to_ascii_lowercase().as_str() {
                    "secure" => cookie.secure = true,
                    "httponly" => cookie.http_only = true,
                    _ => {}
                }
            }
        }

        cookie.expires = match (expires_attr, max_age_attr) {
            (Some(exp), Some(abs)) => Some(if abs > exp { abs } else { exp }),
            (exp, abs) => abs.or(exp),
        };

        Some(cookie)
    }
}

/// SameSite attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Cookies are only sent in first-party context.
    Strict,
    /// Cookies are sent with top-level navigations.
    Lax,
    /// Cookies are sent with all requests.
    None,
}

/// Builds the `Cookie` header value for a request URL.
///
/// Filters out cookies that are disabled, expired, domain-mismatched,
/// path-mismatched, or `secure` over plain HTTP, and joins the rest as
/// `"name=value; name2=value2"`. A malformed URL yields an empty string.
#[must_use]
pub fn cookie_header(cookies: &[Cookie], url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };

    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| c.applies_to_url(&parsed))
        .map(Cookie::to_header_pair)
        .collect();

    pairs.join("; ")
}

/// Merges incoming cookies into an existing list.
///
/// The upsert key is `(domain, name)`: an incoming cookie replaces the
/// matching existing one wholesale, otherwise it is appended. Returns the
/// merged list.
#[must_use]
pub fn merge_cookies(mut existing: Vec<Cookie>, incoming: Vec<Cookie>) -> Vec<Cookie> {
    for cookie in incoming {
        if let Some(slot) = existing
            .iter_mut()
            .find(|c| c.domain == cookie.domain && c.name == cookie.name)
        {
            *slot = cookie;
        } else {
            existing.push(cookie);
        }
    }
    existing
}

/// Checks if a cookie domain matches a request host.
fn domain_matches(cookie_domain: &str, request_host: &str) -> bool {
    let cookie_domain = cookie_domain.to_ascii_lowercase();
    let request_host = request_host.to_ascii_lowercase();

    request_host == cookie_domain || request_host.ends_with(&format!(".{cookie_domain}"))
}
