use crate::config::types::{expand_home, Config};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment flag set by the container image
const CONTAINER_ENV: &str = "AM_I_IN_A_DOCKER_CONTAINER";

/// Loads and parses a configuration file from the given path
///
/// Paths starting with `~` are expanded before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use comicer::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Saving into: {}", config.save_path.display());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses, expands and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    config.save_path = expand_home(&config.save_path);
    config.state_path = expand_home(&config.state_path);
    for source in &mut config.sources {
        if let Some(path) = source.save_path.take() {
            source.save_path = Some(expand_home(&path));
        }
    }

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be correlated with config revisions.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Default location of the user's config file
///
/// Inside the container image this is `/config/config.toml`, otherwise
/// `~/.comicer/config.toml`.
pub fn default_config_path() -> PathBuf {
    if std::env::var_os(CONTAINER_ENV).is_some() {
        PathBuf::from("/config/config.toml")
    } else {
        expand_home(Path::new("~/.comicer/config.toml"))
    }
}

/// Renders the effective configuration as TOML, secrets redacted
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string(config)?)
}
