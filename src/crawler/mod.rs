//! Crawler module for authenticated crawling and downloading
//!
//! This module contains the core orchestration logic, including:
//! - Session reuse and login
//! - Favorite and download link discovery
//! - Ledger-checked downloading
//! - Running several sources side by side

mod auth;
mod discovery;
mod download;
mod engine;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthState, AuthenticationFlow};
pub use discovery::{extract_links, DiscoveryStage, DownloadCandidates, FavoriteSet};
pub use download::{DownloadStage, DownloadStats};
pub use engine::CrawlEngine;

use crate::config::Config;
use crate::driver::{DriverResult, HttpDriver, Navigation, PageDriver};
use crate::{ComicerError, ConfigError};
use std::time::Duration;
use url::Url;

/// Navigates, then pauses for `delay` whatever the outcome
///
/// Every navigation the engine makes goes through here, so a source never
/// sees more than one request per `delay`.
pub async fn navigate_paced<D: PageDriver>(
    driver: &mut D,
    url: &Url,
    delay: Duration,
) -> DriverResult<Navigation> {
    tracing::debug!("Navigating to {}", url);
    let result = driver.navigate(url).await;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    result
}

/// How one source's run ended
#[derive(Debug)]
pub struct SourceOutcome {
    pub name: String,
    pub result: Result<(), ComicerError>,
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs the named sources concurrently, one task and one driver each
///
/// A failing source does not stop the others; every outcome is returned in
/// the order the names were given.
///
/// # Errors
///
/// Returns `ConfigError::UnknownSource` before anything runs if a name is
/// not configured.
///
/// # Example
///
/// ```no_run
/// use comicer::config::load_config;
/// use comicer::crawler::run_sources;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// for outcome in run_sources(&config, &["mox".to_string()]).await? {
///     println!("{}: {}", outcome.name, outcome.is_success());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_sources(
    config: &Config,
    names: &[String],
) -> Result<Vec<SourceOutcome>, ConfigError> {
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let source = config
            .source(name)
            .ok_or_else(|| ConfigError::UnknownSource(name.clone()))?;
        selected.push(source.clone());
    }

    let mut handles = Vec::with_capacity(selected.len());
    for source in selected {
        let config = config.clone();
        let name = source.name.clone();
        let handle = tokio::spawn(async move {
            let driver = HttpDriver::new(&config.driver)?;
            CrawlEngine::new(&config, &source, driver)?.run().await
        });
        handles.push((name, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ComicerError::TaskFailed {
                source_name: name.clone(),
                reason: e.to_string(),
            }),
        };

        match &result {
            Ok(()) => tracing::info!("Source {} completed", name),
            Err(e) => tracing::error!("Source {} failed: {}", name, e),
        }
        outcomes.push(SourceOutcome { name, result });
    }

    Ok(outcomes)
}
