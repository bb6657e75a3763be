//! Crawl engine - one source, one page driver, one run

use crate::config::{Config, DriverConfig, LedgerPolicy, SourceConfig};
use crate::crawler::auth::AuthenticationFlow;
use crate::crawler::discovery::DiscoveryStage;
use crate::crawler::download::DownloadStage;
use crate::driver::PageDriver;
use crate::storage::{DownloadLedger, SessionStore};
use crate::url::host_key;
use crate::ComicerError;
use std::time::{Duration, Instant};

/// Runs the authenticate, discover, download sequence for one source
///
/// The engine owns its driver for the whole run. Per-source variation is
/// carried entirely by the [`SourceConfig`].
pub struct CrawlEngine<D: PageDriver> {
    source: SourceConfig,
    host: String,
    driver: D,
    sessions: SessionStore,
    ledger: DownloadLedger,
    delay: Duration,
    policy: LedgerPolicy,
}

impl<D: PageDriver> CrawlEngine<D> {
    /// Creates an engine using the paths from the global configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use comicer::config::load_config;
    /// use comicer::crawler::CrawlEngine;
    /// use comicer::driver::HttpDriver;
    /// use std::path::Path;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = load_config(Path::new("config.toml"))?;
    /// let source = config.source("mox").unwrap();
    /// let driver = HttpDriver::new(&config.driver)?;
    /// CrawlEngine::new(&config, source, driver)?.run().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: &Config, source: &SourceConfig, driver: D) -> Result<Self, ComicerError> {
        Self::with_stores(
            source.clone(),
            driver,
            SessionStore::new(&config.state_path),
            DownloadLedger::new(config.save_root(source)),
            &config.driver,
        )
    }

    /// Creates an engine with explicit stores
    pub fn with_stores(
        source: SourceConfig,
        driver: D,
        sessions: SessionStore,
        ledger: DownloadLedger,
        driver_config: &DriverConfig,
    ) -> Result<Self, ComicerError> {
        let host = host_key(&source.start_url).ok_or_else(|| ComicerError::MissingHost {
            source_name: source.name.clone(),
        })?;

        Ok(Self {
            source,
            host,
            driver,
            sessions,
            ledger,
            delay: Duration::from_millis(driver_config.navigation_delay_ms),
            policy: driver_config.ledger_policy,
        })
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Runs the source to completion
    ///
    /// 1. Restore the saved session, log in if it is no longer valid
    /// 2. Collect favorites from the start page
    /// 3. Visit every favorite and collect its download candidates
    /// 4. Download every candidate not yet in its item's ledger
    ///
    /// # Errors
    ///
    /// Login failure, missing credentials and unreadable ledgers abort the
    /// run. Ledgers already committed are kept, so the next run resumes.
    pub async fn run(&mut self) -> Result<(), ComicerError> {
        let started = Instant::now();
        tracing::info!("[{}] Starting crawl of {}", self.source.name, self.host);

        AuthenticationFlow::new(&self.source, &self.host, &self.sessions, self.delay)
            .ensure(&mut self.driver)
            .await?;

        let mut discovery = DiscoveryStage::new(&self.source, self.delay);
        let favorites = discovery.discover_favorites(&mut self.driver).await?;
        discovery
            .discover_items(&mut self.driver, &favorites)
            .await?;
        let candidates = discovery.into_candidates();

        let stats = DownloadStage::new(&self.ledger, &self.host, self.policy, self.delay)
            .run(&mut self.driver, &candidates)
            .await?;

        tracing::info!(
            "[{}] Finished in {:?}: {} items, {} downloaded, {} failed, {} already done",
            self.source.name,
            started.elapsed(),
            candidates.len(),
            stats.downloaded,
            stats.failed,
            stats.skipped
        );

        Ok(())
    }
}
