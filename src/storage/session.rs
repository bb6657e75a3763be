use crate::driver::SessionState;
use crate::storage::{write_atomic, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk envelope around a driver's session state
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    host: String,
    saved_at: DateTime<Utc>,
    state: SessionState,
}

/// Persists authenticated sessions, one file per source host
///
/// Sessions are a cache: a missing file is the normal first run, and an
/// unreadable one is logged and treated as missing so the next login
/// simply replaces it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Session file for `host`: `<state_dir>/<host>.json`
    pub fn path_for(&self, host: &str) -> PathBuf {
        self.dir.join(format!("{}.json", host))
    }

    /// Loads the saved session for `host`, if any
    pub fn load(&self, host: &str) -> StorageResult<Option<SessionState>> {
        let path = self.path_for(host);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No saved session for {}", host);
                return Ok(None);
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        match serde_json::from_str::<SessionFile>(&content) {
            Ok(file) if file.host == host => {
                tracing::debug!("Loaded session for {} saved at {}", host, file.saved_at);
                Ok(Some(file.state))
            }
            Ok(file) => {
                tracing::warn!(
                    "Session file {} belongs to {}, ignoring it",
                    path.display(),
                    file.host
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Saves (overwrites) the session for `host`
    pub fn save(&self, host: &str, state: &SessionState) -> StorageResult<()> {
        let file = SessionFile {
            host: host.to_string(),
            saved_at: Utc::now(),
            state: state.clone(),
        };
        let path = self.path_for(host);
        write_atomic(&path, &serde_json::to_vec_pretty(&file)?)?;
        tracing::debug!("Saved session for {} to {}", host, path.display());
        Ok(())
    }
}
