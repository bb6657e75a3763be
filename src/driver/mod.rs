//! Page driver abstraction
//!
//! The crawl engine never touches HTTP or DOM primitives directly. Everything
//! it does to a source goes through [`PageDriver`]: navigation, element
//! queries, form filling, download capture and session export/import.
//!
//! [`HttpDriver`] is the bundled implementation, built on `reqwest` for
//! transport and `scraper` for CSS selector evaluation.

mod cookies;
mod html;
mod http;

pub use cookies::{SessionCookieStore, StoredCookie};
pub use html::HtmlElement;
pub use http::HttpDriver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors raised at the page driver boundary
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("No element matches selector: {0}")]
    ElementNotFound(String),

    #[error("Element matched by {0} cannot be clicked")]
    NotClickable(String),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("No page is loaded")]
    NoPage,

    /// Navigation turned into a file download. Not a failure for callers
    /// that are waiting on [`PageDriver::await_download`].
    #[error("Download is starting: {url}")]
    DownloadStarted { url: String },

    #[error("Navigation did not start a download")]
    NoDownload,

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session state error: {0}")]
    Session(#[from] serde_json::Error),
}

/// Result type for page driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Outcome of a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// The final URL after any redirects
    pub url: Url,
    /// HTTP status code of the final response
    pub status: u16,
}

/// A file download started by a navigation
///
/// Only metadata: the content stays with the driver until
/// [`PageDriver::save`] writes it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// URL the download was served from
    pub url: Url,
    /// Filename proposed by the server
    pub suggested_filename: String,
}

/// Opaque serialized session (cookies and storage) of a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState(serde_json::Value);

impl SessionState {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// Capability the crawl engine drives a source through
///
/// One driver instance is one browsing context: it holds the current page,
/// the session cookies and at most one pending download. Every method is a
/// suspension point; callers run them strictly one after another.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Handle to an element of the current page
    type Element: Send + Sync;

    /// Loads `url` as the current page and reports where it ended up
    async fn navigate(&mut self, url: &Url) -> DriverResult<Navigation>;

    /// All elements of the current page matching `selector`
    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<Self::Element>>;

    /// Attribute value of an element, `None` when absent
    async fn get_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> DriverResult<Option<String>>;

    /// Trimmed text content of an element, `None` when empty
    async fn inner_text(&self, element: &Self::Element) -> DriverResult<Option<String>>;

    /// Trimmed text of the first element matching `selector`
    async fn text_of(&mut self, selector: &str) -> DriverResult<Option<String>>;

    /// Types `value` into the form control matched by `selector`
    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()>;

    /// Clicks the element matched by `selector`
    async fn click(&mut self, selector: &str) -> DriverResult<()>;

    /// Waits for the download started by the last navigation
    async fn await_download(&mut self) -> DriverResult<Download>;

    /// Writes a download to `path`, replacing any existing file
    async fn save(&mut self, download: &Download, path: &Path) -> DriverResult<()>;

    /// Exports the current session
    async fn persist_session(&self) -> DriverResult<SessionState>;

    /// Replaces the current session with a previously exported one
    async fn restore_session(&mut self, state: &SessionState) -> DriverResult<()>;
}
