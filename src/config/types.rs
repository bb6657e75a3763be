use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for Comicer
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Root directory downloaded items are filed under
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,

    /// Directory holding one session file per source host
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default)]
    pub driver: DriverConfig,

    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Looks up a source by its configured name
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Root directory for a source's downloads, honoring a per-source override
    pub fn save_root(&self, source: &SourceConfig) -> PathBuf {
        source
            .save_path
            .clone()
            .unwrap_or_else(|| self.save_path.clone())
    }
}

fn default_save_path() -> PathBuf {
    PathBuf::from("~/comic")
}

fn default_state_path() -> PathBuf {
    PathBuf::from("~/.comicer/state")
}

/// Page driver and pacing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DriverConfig {
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP connect timeout (seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Fixed pause after every navigation (milliseconds)
    #[serde(default = "default_navigation_delay")]
    pub navigation_delay_ms: u64,

    /// When a download URL is written to the ledger
    #[serde(default)]
    pub ledger_policy: LedgerPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            navigation_delay_ms: default_navigation_delay(),
            ledger_policy: LedgerPolicy::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("comicer/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_navigation_delay() -> u64 {
    1000
}

/// Decides when a download URL counts as done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerPolicy {
    /// Record the URL as soon as its download is attempted
    #[default]
    OnAttempt,
    /// Record the URL only after the artifact was saved
    OnSave,
}

/// One content source: where to log in, what to crawl and how to find links
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Short name used on the command line
    pub name: String,

    /// Entry page listing the user's favorites
    pub start_url: Url,

    /// Page hosting the login form
    pub login_url: Url,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<Secret>,

    pub username_selector: String,
    pub password_selector: String,
    pub login_submit_selector: String,
    pub favorite_url_selector: String,
    pub download_url_selector: String,

    /// Keep only download links whose text contains one of these strings
    #[serde(default)]
    pub download_url_text: Vec<String>,

    pub title_selector: String,

    /// Overrides the global save path for this source
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

impl SourceConfig {
    /// Host of the start URL, used to namespace all on-disk state
    pub fn host(&self) -> Option<&str> {
        self.start_url.host_str()
    }

    /// `scheme://host` label shown by `source list`
    pub fn origin_label(&self) -> String {
        format!(
            "{}://{}",
            self.start_url.scheme(),
            self.host().unwrap_or_default()
        )
    }

    /// Returns the credentials when both halves are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.expose())),
            _ => None,
        }
    }
}

/// A secret string that never shows up in logs or rendered config
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value. Avoid logging it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(\"**********\")")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("**********")
    }
}

/// Expands a leading `~` against the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
