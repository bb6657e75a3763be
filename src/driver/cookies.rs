//! Exportable cookie store for the HTTP driver
//!
//! `reqwest`'s own jar cannot be enumerated, so session state could not be
//! persisted through it. This store records every `Set-Cookie` the client
//! sees (redirect hops included) and can be snapshotted to and restored from
//! plain serializable records.

use chrono::{DateTime, Duration, Utc};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use url::Url;

/// A single cookie as persisted in a session file
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    /// Domain the cookie is scoped to, without a leading dot
    pub domain: String,
    /// True when the cookie was set without a `Domain` attribute
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    /// Expiry time, `None` for session cookies
    pub expires: Option<DateTime<Utc>>,
    pub name: String,
    /// Cookie value (sensitive, never log)
    pub value: String,
}

impl StoredCookie {
    /// Parses a `Set-Cookie` header received from `url`
    ///
    /// Returns `None` for headers without a `name=value` pair.
    pub fn parse(header: &str, url: &Url, now: DateTime<Utc>) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let request_host = url.host_str()?.to_lowercase();
        let mut cookie = StoredCookie {
            domain: request_host,
            host_only: true,
            path: default_path(url),
            secure: false,
            expires: None,
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
        };

        let mut max_age = None;
        for attr in parts {
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attr.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "domain" => {
                    let domain = val.trim_start_matches('.').to_lowercase();
                    if !domain.is_empty() {
                        cookie.domain = domain;
                        cookie.host_only = false;
                    }
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "secure" => cookie.secure = true,
                "max-age" => max_age = val.parse::<i64>().ok(),
                "expires" => {
                    if let Ok(at) = DateTime::parse_from_rfc2822(val) {
                        cookie.expires = Some(at.with_timezone(&Utc));
                    }
                }
                _ => {}
            }
        }

        // Max-Age wins over Expires. A lifetime past what chrono can
        // represent never expires.
        if let Some(secs) = max_age {
            cookie.expires = if secs <= 0 {
                Some(now)
            } else {
                Duration::try_seconds(secs).and_then(|ttl| now.checked_add_signed(ttl))
            };
        }

        Some(cookie)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    fn matches(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        };

        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            host == self.domain || host.ends_with(&format!(".{}", self.domain))
        };

        let path = url.path();
        let path_ok = path == self.path
            || (path.starts_with(&self.path)
                && (self.path.ends_with('/') || path[self.path.len()..].starts_with('/')));

        domain_ok && path_ok && (!self.secure || url.scheme() == "https")
    }

    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

impl fmt::Debug for StoredCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCookie")
            .field("domain", &self.domain)
            .field("host_only", &self.host_only)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Directory of the request path, per RFC 6265 section 5.1.4
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Cookie store shared between the HTTP client and session persistence
#[derive(Debug, Default)]
pub struct SessionCookieStore {
    cookies: RwLock<Vec<StoredCookie>>,
}

impl SessionCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a cookie; an already expired cookie deletes its slot
    pub fn insert(&self, cookie: StoredCookie) {
        let now = Utc::now();
        let mut cookies = self.cookies.write().unwrap_or_else(|e| e.into_inner());
        cookies.retain(|c| !c.same_slot(&cookie));
        if !cookie.is_expired(now) {
            cookies.push(cookie);
        }
    }

    /// Live cookies, expired ones dropped
    pub fn snapshot(&self) -> Vec<StoredCookie> {
        let now = Utc::now();
        let cookies = self.cookies.read().unwrap_or_else(|e| e.into_inner());
        cookies
            .iter()
            .filter(|c| !c.is_expired(now))
            .cloned()
            .collect()
    }

    /// Replaces the whole store
    pub fn replace(&self, new_cookies: Vec<StoredCookie>) {
        let mut cookies = self.cookies.write().unwrap_or_else(|e| e.into_inner());
        *cookies = new_cookies;
    }

    /// `Cookie` header value for a request to `url`
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let now = Utc::now();
        let cookies = self.cookies.read().unwrap_or_else(|e| e.into_inner());
        let pairs: Vec<String> = cookies
            .iter()
            .filter(|c| !c.is_expired(now) && c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

impl CookieStore for SessionCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let now = Utc::now();
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            match StoredCookie::parse(raw, url, now) {
                Some(cookie) => self.insert(cookie),
                None => tracing::debug!("Ignoring malformed Set-Cookie from {}", url),
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|value| HeaderValue::from_str(&value).ok())
    }
}
