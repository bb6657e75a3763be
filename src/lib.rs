//! Comicer: an authenticated crawl-and-download engine
//!
//! This crate logs into a content source once, rediscovers the user's favorited
//! items, extracts the downloadable file links on each item page and fetches the
//! files that earlier runs have not already retrieved.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Comicer operations
#[derive(Debug, Error)]
pub enum ComicerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Login failed: still redirected away from {url} after submitting credentials")]
    LoginFailed { url: String },

    #[error("Source '{source_name}' requires a login but has no username/password configured")]
    MissingCredentials { source_name: String },

    #[error("Source '{source_name}' has no host to key its state by")]
    MissingHost { source_name: String },

    #[error("Source '{source_name}' task ended abnormally: {reason}")]
    TaskFailed { source_name: String, reason: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to render TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

/// Result type alias for Comicer operations
pub type Result<T> = std::result::Result<T, ComicerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, SourceConfig};
pub use crawler::{run_sources, CrawlEngine, SourceOutcome};
pub use driver::{HttpDriver, PageDriver};
pub use storage::{DownloadLedger, SessionStore};
pub use url::resolve;
