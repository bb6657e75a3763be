//! In-memory page driver for orchestration tests

use crate::config::{Secret, SourceConfig};
use crate::driver::{Download, DriverError, DriverResult, Navigation, PageDriver, SessionState};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use url::Url;

pub const START: &str = "https://x.com/favorites";
pub const LOGIN: &str = "https://x.com/login";

/// A source wired to the selectors [`ScriptedDriver`] pages use
pub fn source() -> SourceConfig {
    SourceConfig {
        name: "x".to_string(),
        start_url: Url::parse(START).unwrap(),
        login_url: Url::parse(LOGIN).unwrap(),
        username: Some("reader".to_string()),
        password: Some(Secret::new("hunter2")),
        username_selector: "#user".to_string(),
        password_selector: "#pass".to_string(),
        login_submit_selector: "#submit".to_string(),
        favorite_url_selector: "a.fav".to_string(),
        download_url_selector: "a.dl".to_string(),
        download_url_text: vec![],
        title_selector: "h1".to_string(),
        save_path: None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedElement {
    pub href: Option<String>,
    pub text: Option<String>,
    /// Attribute lookups fail instead of returning a value
    pub broken: bool,
}

impl ScriptedElement {
    pub fn link(href: &str) -> Self {
        Self {
            href: Some(href.to_string()),
            ..Self::default()
        }
    }

    pub fn link_with_text(href: &str, text: &str) -> Self {
        Self {
            href: Some(href.to_string()),
            text: Some(text.to_string()),
            broken: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub title: Option<String>,
    pub elements: HashMap<String, Vec<ScriptedElement>>,
}

/// Scripted site: a start page that redirects to the login page until the
/// submit control is clicked, item pages, and download URLs.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    pub pages: HashMap<String, ScriptedPage>,
    pub downloads: HashMap<String, String>,
    /// Whether clicking submit logs the user in
    pub accept_login: bool,
    pub logged_in: bool,

    pub navigations: Vec<String>,
    pub fills: Vec<(String, String)>,
    pub clicks: usize,

    current: Option<String>,
    pending: Option<Download>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            accept_login: true,
            ..Self::default()
        }
    }

    pub fn logged_in(mut self) -> Self {
        self.logged_in = true;
        self
    }

    pub fn page(mut self, url: &str, page: ScriptedPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn favorites(self, hrefs: &[&str]) -> Self {
        let mut page = ScriptedPage::default();
        page.elements.insert(
            "a.fav".to_string(),
            hrefs.iter().map(|h| ScriptedElement::link(h)).collect(),
        );
        self.page(START, page)
    }

    pub fn item(self, url: &str, title: Option<&str>, download_hrefs: &[&str]) -> Self {
        let mut page = ScriptedPage {
            title: title.map(str::to_string),
            ..ScriptedPage::default()
        };
        page.elements.insert(
            "a.dl".to_string(),
            download_hrefs
                .iter()
                .map(|h| ScriptedElement::link(h))
                .collect(),
        );
        self.page(url, page)
    }

    pub fn download(mut self, url: &str, filename: &str) -> Self {
        self.downloads.insert(url.to_string(), filename.to_string());
        self
    }

    /// How many times `url` was navigated to
    pub fn visits(&self, url: &str) -> usize {
        self.navigations.iter().filter(|u| u.as_str() == url).count()
    }

    fn current_page(&self) -> Option<&ScriptedPage> {
        self.current.as_ref().and_then(|u| self.pages.get(u))
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    type Element = ScriptedElement;

    async fn navigate(&mut self, url: &Url) -> DriverResult<Navigation> {
        let requested = url.to_string();
        self.navigations.push(requested.clone());
        self.pending = None;

        if let Some(filename) = self.downloads.get(&requested) {
            self.pending = Some(Download {
                url: url.clone(),
                suggested_filename: filename.clone(),
            });
            return Err(DriverError::DownloadStarted { url: requested });
        }

        let landed = if requested == START && !self.logged_in {
            LOGIN.to_string()
        } else {
            requested
        };
        self.current = Some(landed.clone());

        Ok(Navigation {
            url: Url::parse(&landed)?,
            status: 200,
        })
    }

    async fn query_all(&mut self, selector: &str) -> DriverResult<Vec<ScriptedElement>> {
        Ok(self
            .current_page()
            .and_then(|p| p.elements.get(selector))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_attribute(
        &self,
        element: &ScriptedElement,
        name: &str,
    ) -> DriverResult<Option<String>> {
        if element.broken {
            return Err(DriverError::ElementNotFound(name.to_string()));
        }
        Ok(match name {
            "href" => element.href.clone(),
            _ => None,
        })
    }

    async fn inner_text(&self, element: &ScriptedElement) -> DriverResult<Option<String>> {
        Ok(element.text.clone())
    }

    async fn text_of(&mut self, selector: &str) -> DriverResult<Option<String>> {
        if selector != "h1" {
            return Ok(None);
        }
        Ok(self.current_page().and_then(|p| p.title.clone()))
    }

    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()> {
        self.fills.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&mut self, _selector: &str) -> DriverResult<()> {
        self.clicks += 1;
        if self.accept_login {
            self.logged_in = true;
        }
        Ok(())
    }

    async fn await_download(&mut self) -> DriverResult<Download> {
        self.pending.take().ok_or(DriverError::NoDownload)
    }

    async fn save(&mut self, download: &Download, path: &Path) -> DriverResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, download.url.as_str()).await?;
        Ok(())
    }

    async fn persist_session(&self) -> DriverResult<SessionState> {
        Ok(SessionState::new(json!({ "logged_in": self.logged_in })))
    }

    async fn restore_session(&mut self, state: &SessionState) -> DriverResult<()> {
        self.logged_in = serde_json::from_value(state.as_value()["logged_in"].clone())?;
        Ok(())
    }
}
