//! adaptest-store — JSON file repository for session snapshots.
//!
//! The engine performs no I/O of its own; this crate is the persistence
//! collaborator that saves and restores [`SessionSnapshot`]s. Writes are
//! atomic (temp file in the target directory, then rename) so a crash never
//! leaves a half-written snapshot behind.
//!
//! The store does not lock: at most one concurrent writer per session id is
//! the caller's contract, typically via a session-scoped lock or a
//! single-writer queue.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use adaptest_core::session::SessionState;
use adaptest_core::snapshot::SessionSnapshot;

/// Environment variable that overrides the default data directory.
pub const DATA_DIR_ENV: &str = "ADAPTEST_DATA_DIR";

const SNAPSHOT_PREFIX: &str = "session-";

/// Errors from the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No data directory could be resolved for this platform.
    #[error("unable to resolve a data directory; set {DATA_DIR_ENV}")]
    NoDataDir,

    /// No snapshot exists for the session id.
    #[error("no stored session with id {0}")]
    NotFound(Uuid),

    /// Filesystem failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file exists but does not parse.
    #[error("corrupt snapshot at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Summary of one stored session, for listings.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredSession {
    pub session_id: Uuid,
    pub learner_name: String,
    pub state: SessionState,
    pub items_administered: usize,
    /// Last modification time of the snapshot file.
    pub updated_at: DateTime<Utc>,
}

/// A directory of session snapshot files, one JSON file per session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    data_dir: PathBuf,
}

impl SessionStore {
    /// A store rooted at an explicit directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// A store rooted at the platform default: `$ADAPTEST_DATA_DIR` when
    /// set, otherwise the local data directory (e.g. `~/.local/share` or
    /// `%LOCALAPPDATA%`) under `adaptest/`.
    pub fn open_default() -> Result<Self, StoreError> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return Ok(Self::new(dir));
        }
        let base = dirs::data_local_dir().ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(base.join("adaptest")))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn snapshot_path(&self, session_id: Uuid) -> PathBuf {
        self.data_dir.join(format!("{SNAPSHOT_PREFIX}{session_id}.json"))
    }

    /// Persist a snapshot atomically and return the file path.
    ///
    /// The write goes to a temp file in the data directory and is renamed
    /// over the target, so readers never observe a partial snapshot. Callers
    /// must ensure at most one concurrent writer per session id.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.data_dir)?;
        let target = self.snapshot_path(snapshot.session_id);

        let temp = tempfile::NamedTempFile::new_in(&self.data_dir)?;
        serde_json::to_writer_pretty(&temp, snapshot)
            .map_err(|e| StoreError::Io(e.into()))?;
        temp.persist(&target).map_err(|e| StoreError::Io(e.error))?;

        tracing::debug!(session_id = %snapshot.session_id, path = %target.display(), "snapshot saved");
        Ok(target)
    }

    /// Load the snapshot for a session id.
    pub fn load(&self, session_id: Uuid) -> Result<SessionSnapshot, StoreError> {
        let path = self.snapshot_path(session_id);
        if !path.exists() {
            return Err(StoreError::NotFound(session_id));
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt { path, source })
    }

    /// List stored sessions, newest first. Unparseable files are skipped
    /// with a warning rather than failing the whole listing.
    pub fn list(&self) -> Result<Vec<StoredSession>, StoreError> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(SNAPSHOT_PREFIX) || !name.ends_with(".json") {
                continue;
            }

            let content = std::fs::read_to_string(&path)?;
            let snapshot: SessionSnapshot = match serde_json::from_str(&content) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let updated_at = entry
                .metadata()?
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            sessions.push(StoredSession {
                session_id: snapshot.session_id,
                learner_name: snapshot.learner.name.clone(),
                state: snapshot.state,
                items_administered: snapshot.administered_item_ids.len(),
                updated_at,
            });
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    /// Delete the snapshot for a session id.
    pub fn delete(&self, session_id: Uuid) -> Result<(), StoreError> {
        let path = self.snapshot_path(session_id);
        if !path.exists() {
            return Err(StoreError::NotFound(session_id));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }
}
