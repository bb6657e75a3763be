//! On-disk state shared across runs
//!
//! - [`SessionStore`]: one session file per source host
//! - [`DownloadLedger`]: one file per item listing URLs already downloaded
//!
//! Both write through a temporary file and rename, so an interrupted write
//! leaves the previous content in place.

mod ledger;
mod paths;
mod session;

pub use ledger::{is_ledger_file_name, DownloadLedger, LEDGER_FILE_NAME};
pub use paths::sanitize_component;
pub use session::SessionStore;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Ledger {path} is not a JSON list of URLs: {source}")]
    CorruptLedger {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Item title '{0}' cannot be used as a directory name")]
    InvalidTitle(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Writes `contents` to `path` via a sibling temporary file
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
