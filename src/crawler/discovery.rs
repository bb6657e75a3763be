//! Favorite and download link discovery
//!
//! Both passes follow the same pattern: navigate, query a selector, read each
//! element's `href`, resolve it against the source's origin. Anything that
//! fails along the way (no `href`, unresolvable URL, filtered link text) is
//! page noise and is dropped without failing the run.

use crate::config::SourceConfig;
use crate::crawler::navigate_paced;
use crate::driver::{DriverError, PageDriver};
use crate::url::to_absolute;
use crate::ComicerError;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use url::Url;

/// Absolute item URLs found on the start page
pub type FavoriteSet = BTreeSet<Url>;

/// Item title to the download URLs found on the item's page(s)
pub type DownloadCandidates = BTreeMap<String, BTreeSet<Url>>;

/// Accumulates download candidates for one run
pub struct DiscoveryStage<'a> {
    source: &'a SourceConfig,
    delay: Duration,
    candidates: DownloadCandidates,
}

impl<'a> DiscoveryStage<'a> {
    pub fn new(source: &'a SourceConfig, delay: Duration) -> Self {
        Self {
            source,
            delay,
            candidates: DownloadCandidates::new(),
        }
    }

    /// Collects the favorite item URLs from the start page
    pub async fn discover_favorites<D: PageDriver>(
        &self,
        driver: &mut D,
    ) -> Result<FavoriteSet, ComicerError> {
        navigate_paced(driver, &self.source.start_url, self.delay).await?;
        let favorites = extract_links(
            driver,
            &self.source.favorite_url_selector,
            &self.source.start_url,
            &[],
        )
        .await?;

        tracing::info!(
            "Found {} favorites on {}",
            favorites.len(),
            self.source.start_url
        );
        Ok(favorites)
    }

    /// Visits every favorite and records its download candidates
    pub async fn discover_items<D: PageDriver>(
        &mut self,
        driver: &mut D,
        favorites: &FavoriteSet,
    ) -> Result<(), ComicerError> {
        for url in favorites {
            self.discover_item(driver, url).await?;
        }
        Ok(())
    }

    /// Visits one item page; returns its title, or `None` if it was skipped
    ///
    /// Items whose page cannot be loaded or has no title are skipped. Items
    /// sharing a title have their candidates merged.
    pub async fn discover_item<D: PageDriver>(
        &mut self,
        driver: &mut D,
        url: &Url,
    ) -> Result<Option<String>, ComicerError> {
        if let Err(e) = navigate_paced(driver, url, self.delay).await {
            tracing::warn!("Skipping favorite {}: {}", url, e);
            return Ok(None);
        }

        let title = match driver.text_of(&self.source.title_selector).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                tracing::warn!("Skipping favorite {}: no title found", url);
                return Ok(None);
            }
            // A bad selector is a configuration problem, not page noise
            Err(e @ DriverError::InvalidSelector(_)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping favorite {}: {}", url, e);
                return Ok(None);
            }
        };

        let links = extract_links(
            driver,
            &self.source.download_url_selector,
            &self.source.start_url,
            &self.source.download_url_text,
        )
        .await?;

        tracing::info!("{}: {} download candidates on {}", title, links.len(), url);
        self.candidates
            .entry(title.clone())
            .or_default()
            .extend(links);

        Ok(Some(title))
    }

    pub fn candidates(&self) -> &DownloadCandidates {
        &self.candidates
    }

    pub fn into_candidates(self) -> DownloadCandidates {
        self.candidates
    }
}

/// Resolved `href`s of the current page's elements matching `selector`
///
/// With a non-empty `text_filter`, an element is kept only if its text
/// contains one of the filter strings.
pub async fn extract_links<D: PageDriver>(
    driver: &mut D,
    selector: &str,
    base: &Url,
    text_filter: &[String],
) -> Result<BTreeSet<Url>, DriverError> {
    let elements = driver.query_all(selector).await?;
    let mut links = BTreeSet::new();

    for element in &elements {
        if !text_filter.is_empty() {
            let text = driver.inner_text(element).await.ok().flatten();
            let wanted = text
                .as_deref()
                .is_some_and(|t| text_filter.iter().any(|f| t.contains(f.as_str())));
            if !wanted {
                continue;
            }
        }

        let href = match driver.get_attribute(element, "href").await {
            Ok(Some(href)) => href,
            Ok(None) => {
                tracing::debug!("Element matching {} has no href", selector);
                continue;
            }
            Err(e) => {
                tracing::debug!("Could not read href of {}: {}", selector, e);
                continue;
            }
        };

        match to_absolute(base, &href) {
            Some(url) => {
                links.insert(url);
            }
            None => tracing::debug!("Discarding unresolvable link '{}'", href),
        }
    }

    Ok(links)
}
