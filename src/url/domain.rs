use url::Url;

/// Extracts the host a source's on-disk state is keyed by
///
/// The host is lowercased and carries no port, so sessions and item
/// directories stay stable if the port changes.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use comicer::url::host_key;
///
/// let url = Url::parse("https://MOX.example:8443/favorites").unwrap();
/// assert_eq!(host_key(&url), Some("mox.example".to_string()));
///
/// let url = Url::parse("data:text/plain,hello").unwrap();
/// assert_eq!(host_key(&url), None);
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}
