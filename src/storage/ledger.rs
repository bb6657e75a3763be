use crate::storage::{sanitize_component, write_atomic, StorageError, StorageResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Name of the ledger file inside an item directory
pub const LEDGER_FILE_NAME: &str = "url.json";

/// Whether `name` would collide with the ledger file or its temporary sibling
///
/// Compared case-insensitively, for case-folding filesystems.
pub fn is_ledger_file_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.strip_prefix(LEDGER_FILE_NAME)
        .is_some_and(|rest| rest.is_empty() || rest == ".tmp")
}

/// Per-item record of URLs already downloaded
///
/// Layout: `<save_root>/<host>/<title>/url.json`, a JSON array of URL
/// strings. The array is written sorted, but readers must treat it as a set.
///
/// A ledger never forgets: [`DownloadLedger::commit`] always writes the union
/// of what is on disk and what it was given. A ledger that exists but cannot
/// be parsed is an error, never silently reset.
#[derive(Debug, Clone)]
pub struct DownloadLedger {
    root: PathBuf,
}

impl DownloadLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory downloads for an item are saved into
    pub fn item_dir(&self, host: &str, title: &str) -> StorageResult<PathBuf> {
        let title = sanitize_component(title)
            .ok_or_else(|| StorageError::InvalidTitle(title.to_string()))?;
        Ok(self.root.join(host).join(title))
    }

    pub fn ledger_path(&self, host: &str, title: &str) -> StorageResult<PathBuf> {
        Ok(self.item_dir(host, title)?.join(LEDGER_FILE_NAME))
    }

    /// URLs recorded for an item; empty when no ledger exists yet
    pub fn load(&self, host: &str, title: &str) -> StorageResult<BTreeSet<String>> {
        let path = self.ledger_path(host, title)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        let urls: Vec<String> = serde_json::from_str(&content)
            .map_err(|source| StorageError::CorruptLedger { path, source })?;
        Ok(urls.into_iter().collect())
    }

    /// Whether `url` was already downloaded for the item
    pub fn contains(&self, host: &str, title: &str, url: &str) -> StorageResult<bool> {
        Ok(self.load(host, title)?.contains(url))
    }

    /// Writes the union of the stored URLs and `urls`, returning that union
    ///
    /// Committing the same set twice leaves the file unchanged.
    pub fn commit(
        &self,
        host: &str,
        title: &str,
        urls: &BTreeSet<String>,
    ) -> StorageResult<BTreeSet<String>> {
        let mut merged = self.load(host, title)?;
        merged.extend(urls.iter().cloned());

        let path = self.ledger_path(host, title)?;
        let list: Vec<&String> = merged.iter().collect();
        write_atomic(&path, &serde_json::to_vec(&list)?)?;

        tracing::debug!(
            "Committed {} URLs to ledger {}",
            merged.len(),
            path.display()
        );
        Ok(merged)
    }
}
