use crate::config::types::{Config, DriverConfig, SourceConfig};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_path("save-path", &config.save_path)?;
    validate_path("state-path", &config.state_path)?;
    validate_driver_config(&config.driver)?;

    let mut names = HashSet::new();
    for source in &config.sources {
        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source name '{}'",
                source.name
            )));
        }
        validate_source(source)?;
    }

    Ok(())
}

/// Paths must be absolute once `~` has been expanded
fn validate_path(key: &str, path: &Path) -> Result<(), ConfigError> {
    if !path.is_absolute() {
        return Err(ConfigError::Validation(format!(
            "{} must be an absolute path, got '{}'",
            key,
            path.display()
        )));
    }
    Ok(())
}

fn validate_driver_config(config: &DriverConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a single source entry
fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    validate_source_name(&source.name)?;

    validate_http_url("start-url", &source.start_url)?;
    validate_http_url("login-url", &source.login_url)?;

    // Relative links are resolved against the start URL's origin
    if source.start_url.scheme() != source.login_url.scheme()
        || source.start_url.host_str() != source.login_url.host_str()
    {
        return Err(ConfigError::Validation(format!(
            "Source '{}': start-url and login-url must share scheme and host",
            source.name
        )));
    }

    for (key, selector) in [
        ("username-selector", &source.username_selector),
        ("password-selector", &source.password_selector),
        ("login-submit-selector", &source.login_submit_selector),
        ("favorite-url-selector", &source.favorite_url_selector),
        ("download-url-selector", &source.download_url_selector),
        ("title-selector", &source.title_selector),
    ] {
        validate_selector(&source.name, key, selector)?;
    }

    if let Some(path) = &source.save_path {
        validate_path("source save-path", path)?;
    }

    Ok(())
}

fn validate_source_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "source name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "source name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

fn validate_http_url(key: &str, url: &Url) -> Result<(), ConfigError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            key, url
        )));
    }

    Ok(())
}

fn validate_selector(source: &str, key: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!(
            "Source '{}': {} cannot be empty",
            source, key
        )));
    }

    if Selector::parse(selector).is_err() {
        return Err(ConfigError::InvalidSelector(format!(
            "Source '{}': {} '{}' is not a valid CSS selector",
            source, key, selector
        )));
    }

    Ok(())
}
