//! Idempotent file retrieval
//!
//! For every item, URLs already in the item's ledger are skipped. Each
//! remaining URL is navigated to, which is expected to start a download; the
//! navigation's own error is ignored because the download event is what
//! counts. The ledger is committed once per item, after all its URLs.

use crate::config::LedgerPolicy;
use crate::crawler::discovery::DownloadCandidates;
use crate::crawler::navigate_paced;
use crate::driver::{DriverError, PageDriver};
use crate::storage::{is_ledger_file_name, sanitize_component, DownloadLedger, StorageError};
use crate::ComicerError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Counters for one download pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Files saved
    pub downloaded: usize,
    /// URLs skipped because the ledger already had them
    pub skipped: usize,
    /// Attempts that produced no saved file
    pub failed: usize,
}

impl DownloadStats {
    fn absorb(&mut self, other: DownloadStats) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Downloads every candidate not yet in its item's ledger
pub struct DownloadStage<'a> {
    ledger: &'a DownloadLedger,
    host: &'a str,
    policy: LedgerPolicy,
    delay: Duration,
}

impl<'a> DownloadStage<'a> {
    pub fn new(
        ledger: &'a DownloadLedger,
        host: &'a str,
        policy: LedgerPolicy,
        delay: Duration,
    ) -> Self {
        Self {
            ledger,
            host,
            policy,
            delay,
        }
    }

    /// Processes every item in `candidates`
    ///
    /// # Errors
    ///
    /// A ledger that cannot be read or written aborts the pass. Items whose
    /// title cannot be used as a directory name are skipped.
    pub async fn run<D: PageDriver>(
        &self,
        driver: &mut D,
        candidates: &DownloadCandidates,
    ) -> Result<DownloadStats, ComicerError> {
        let mut stats = DownloadStats::default();

        for (title, urls) in candidates {
            match self.process_item(driver, title, urls).await {
                Ok(item_stats) => stats.absorb(item_stats),
                Err(ComicerError::Storage(StorageError::InvalidTitle(t))) => {
                    tracing::warn!("Skipping item with unusable title '{}'", t);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stats)
    }

    /// Downloads one item's new URLs and commits its ledger
    pub async fn process_item<D: PageDriver>(
        &self,
        driver: &mut D,
        title: &str,
        urls: &BTreeSet<Url>,
    ) -> Result<DownloadStats, ComicerError> {
        let done = self.ledger.load(self.host, title)?;
        let item_dir = self.ledger.item_dir(self.host, title)?;
        std::fs::create_dir_all(&item_dir)?;

        let mut stats = DownloadStats::default();
        let mut recorded = BTreeSet::new();

        for url in urls {
            if done.contains(url.as_str()) {
                stats.skipped += 1;
                continue;
            }

            if self.policy == LedgerPolicy::OnAttempt {
                recorded.insert(url.to_string());
            }

            match self.fetch(driver, url, &item_dir).await {
                Ok(path) => {
                    tracing::info!("{}: saved {}", title, path.display());
                    stats.downloaded += 1;
                    recorded.insert(url.to_string());
                }
                Err(e) => {
                    tracing::warn!("{}: download of {} failed: {}", title, url, e);
                    stats.failed += 1;
                }
            }
        }

        self.ledger.commit(self.host, title, &recorded)?;

        if stats.downloaded + stats.failed > 0 {
            tracing::info!(
                "{}: {} downloaded, {} failed, {} already done",
                title,
                stats.downloaded,
                stats.failed,
                stats.skipped
            );
        }

        Ok(stats)
    }

    /// Navigates to `url`, waits for its download and saves it in `dir`
    async fn fetch<D: PageDriver>(
        &self,
        driver: &mut D,
        url: &Url,
        dir: &Path,
    ) -> Result<PathBuf, DriverError> {
        match navigate_paced(driver, url, self.delay).await {
            Ok(_) | Err(DriverError::DownloadStarted { .. }) => {}
            Err(e) => tracing::debug!("Navigation to {} raised {}", url, e),
        }

        let download = driver.await_download().await?;
        let filename = match sanitize_component(&download.suggested_filename) {
            Some(name) if is_ledger_file_name(&name) => format!("_{}", name),
            Some(name) => name,
            None => "download".to_string(),
        };
        let path = dir.join(filename);

        driver.save(&download, &path).await?;
        Ok(path)
    }
}
