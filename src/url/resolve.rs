use url::Url;

/// Turns a possibly-relative href into an absolute URL string
///
/// # Rules
///
/// 1. `http://` and `https://` hrefs are returned unchanged
/// 2. If `base` has no host the href is returned unchanged; it cannot be
///    resolved and the caller must discard it
/// 3. Otherwise the result is `scheme://host[:port]` followed by the href
///
/// Not RFC 3986 resolution: `../`, query-relative and protocol-relative
/// forms are not handled. Use [`to_absolute`] to get a parsed URL or `None`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use comicer::url::resolve;
///
/// let base = Url::parse("https://x.com/favorites").unwrap();
/// assert_eq!(resolve(&base, "/a/b"), "https://x.com/a/b");
/// assert_eq!(resolve(&base, "https://y.com/c"), "https://y.com/c");
/// ```
pub fn resolve(base: &Url, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    let host = match base.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return href.to_string(),
    };

    match base.port() {
        Some(port) => format!("{}://{}:{}{}", base.scheme(), host, port, href),
        None => format!("{}://{}{}", base.scheme(), host, href),
    }
}

/// Resolves an href and parses the result
///
/// Returns `None` for anything that does not end up as a valid absolute
/// `http`/`https` URL. Callers treat `None` as noise and skip the link.
///
/// Only absolute and path-absolute hrefs are accepted; `page2` would
/// otherwise be glued onto the host name.
pub fn to_absolute(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    let absolute = href.starts_with("http://") || href.starts_with("https://");
    if !absolute && !href.starts_with('/') {
        return None;
    }

    let url = Url::parse(&resolve(base, href)).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}
