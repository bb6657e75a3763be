//! HTTP page driver
//!
//! Drives a source with plain HTTP requests:
//! - GET navigation following redirects, HTML responses become the page
//! - non-HTML or `attachment` responses become the pending download, whose
//!   body is streamed to disk by `save`
//! - a non-2xx response never becomes a download; HTML error pages still
//!   load, their status is reported in [`Navigation`]
//! - form submission for login, cookies captured by [`SessionCookieStore`]

use crate::config::DriverConfig;
use crate::driver::cookies::{SessionCookieStore, StoredCookie};
use crate::driver::html::{self, ClickTarget, FormSubmission, HtmlElement};
use crate::driver::{
    Download, DriverError, DriverResult, Navigation, PageDriver, SessionState,
};
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// The page currently loaded in the driver
#[derive(Debug, Clone)]
struct Page {
    url: Url,
    body: String,
}

/// Page driver backed by `reqwest` and `scraper`
pub struct HttpDriver {
    client: Client,
    cookies: Arc<SessionCookieStore>,
    page: Option<Page>,
    /// Values typed into the current page's form controls, keyed by name
    filled: HashMap<String, String>,
    pending: Option<Download>,
    /// Unread body of the last download, consumed by `save`
    body: Option<Response>,
}

impl HttpDriver {
    /// Builds a driver with an empty session
    ///
    /// # Example
    ///
    /// ```no_run
    /// use comicer::config::DriverConfig;
    /// use comicer::driver::HttpDriver;
    ///
    /// let driver = HttpDriver::new(&DriverConfig::default()).unwrap();
    /// ```
    pub fn new(config: &DriverConfig) -> DriverResult<Self> {
        let cookies = Arc::new(SessionCookieStore::new());

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .cookie_provider(Arc::clone(&cookies))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            cookies,
            page: None,
            filled: HashMap::new(),
            pending: None,
            body: None,
        })
    }

    /// URL of the current page
    pub fn current_url(&self) -> Option<&Url> {
        self.page.as_ref().map(|p| &p.url)
    }

    fn page(&self) -> DriverResult<&Page> {
        self.page.as_ref().ok_or(DriverError::NoPage)
    }

    /// Turns a response into either the current page or the pending download
    async fn absorb(&mut self, response: Response) -> DriverResult<Navigation> {
        let url = response.url().clone();
        let status = response.status().as_u16();

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let is_attachment = disposition
            .as_deref()
            .is_some_and(|d| d.trim_start().to_ascii_lowercase().starts_with("attachment"));
        let is_html = content_type.is_empty()
            || content_type.contains("text/html")
            || content_type.contains("application/xhtml");

        if is_attachment || !is_html {
            // An error body is not the file that was asked for
            if !response.status().is_success() {
                return Err(DriverError::Status {
                    url: url.to_string(),
                    status,
                });
            }

            let suggested_filename = disposition
                .as_deref()
                .and_then(filename_from_disposition)
                .or_else(|| filename_from_url(&url))
                .unwrap_or_else(|| "download".to_string());
            tracing::debug!(
                "Download started from {} ({:?} bytes, suggested '{}')",
                url,
                response.content_length(),
                suggested_filename
            );
            self.pending = Some(Download {
                url: url.clone(),
                suggested_filename,
            });
            self.body = Some(response);
            return Err(DriverError::DownloadStarted {
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        self.page = Some(Page {
            url: url.clone(),
            body,
        });
        self.filled.clear();

        Ok(Navigation { url, status })
    }

    async fn submit(&mut self, form: FormSubmission) -> DriverResult<()> {
        let base = self.page()?.url.clone();
        let target = match &form.action {
            Some(action) => base.join(action)?,
            None => base,
        };

        tracing::debug!("Submitting form to {}", target);
        let request = if form.post {
            self.client.post(target).form(&form.fields)
        } else {
            self.client.get(target).query(&form.fields)
        };

        let response = request.send().await?;
        self.absorb(response).await.map(|_| ())
    }
}

#[async_trait]
impl PageDriver for HttpDriver {
    type Element = HtmlElement;

    async fn navigate(&mut self, url: &Url) -> DriverResult<Navigation> {
        self.pending = None;
        self.body = None;
        let response = self.client.get(url.clone()).send().await?;
        self.absorb(response).await
    }

    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<HtmlElement>> {
        html::select_all(&self.page()?.body, selector)
    }

    async fn get_attribute(
        &self,
        element: &HtmlElement,
        name: &str,
    ) -> DriverResult<Option<String>> {
        Ok(element.attr(name).map(str::to_string))
    }

    async fn inner_text(&self, element: &HtmlElement) -> DriverResult<Option<String>> {
        Ok(element.text().map(str::to_string))
    }

    async fn text_of(&mut self, selector: &str) -> DriverResult<Option<String>> {
        html::first_text(&self.page()?.body, selector)
    }

    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()> {
        let name = html::control_name(&self.page()?.body, selector)?;
        self.filled.insert(name, value.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        let target = html::click_target(&self.page()?.body, selector, &self.filled)?;
        match target {
            ClickTarget::Submit(form) => self.submit(form).await,
            ClickTarget::Link(href) => {
                let url = self.page()?.url.join(&href)?;
                self.navigate(&url).await.map(|_| ())
            }
        }
    }

    async fn await_download(&mut self) -> DriverResult<Download> {
        self.pending.take().ok_or(DriverError::NoDownload)
    }

    async fn save(&mut self, download: &Download, path: &Path) -> DriverResult<()> {
        let response = match self.body.take() {
            Some(response) if response.url() == &download.url => response,
            _ => return Err(DriverError::NoDownload),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut part = path.as_os_str().to_owned();
        part.push(".part");
        let part = std::path::PathBuf::from(part);

        match stream_to_file(response, &part).await {
            Ok(written) => {
                tokio::fs::rename(&part, path).await?;
                tracing::debug!("Wrote {} bytes to {}", written, path.display());
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn persist_session(&self) -> DriverResult<SessionState> {
        let value = serde_json::to_value(self.cookies.snapshot())?;
        Ok(SessionState::new(value))
    }

    async fn restore_session(&mut self, state: &SessionState) -> DriverResult<()> {
        let cookies: Vec<StoredCookie> = serde_json::from_value(state.as_value().clone())?;
        tracing::debug!("Restoring {} session cookies", cookies.len());
        self.cookies.replace(cookies);
        Ok(())
    }
}

/// Copies a response body into `path` chunk by chunk
async fn stream_to_file(mut response: Response, path: &Path) -> DriverResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Extracts the filename from a `Content-Disposition` header
///
/// Prefers the RFC 5987 `filename*` form over plain `filename`.
fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if key == "filename*" {
            // charset'language'percent-encoded
            let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
            if let Ok(decoded) = urlencoding::decode(encoded) {
                let decoded = decoded.trim().to_string();
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        } else if key == "filename" {
            let name = value.trim_matches('"').trim();
            if !name.is_empty() {
                plain = Some(name.to_string());
            }
        }
    }
    plain
}

/// Last non-empty path segment of a URL, percent-decoded
fn filename_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    urlencoding::decode(segment)
        .ok()
        .map(|s| s.into_owned())
        .filter(|s| !s.is_empty())
}
