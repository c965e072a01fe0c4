//! Progress persistence adapters.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use roc_core::ports::{PortError, ProgressStore};
use roc_types::ProgressData;
use tracing::{debug, info, warn};

/// Stores progress as pretty-printed JSON in a single file.
///
/// Reads and writes are serialized through an async mutex so a save never
/// interleaves with a load of the same file. A missing or unreadable file
/// loads as fresh progress.
#[derive(Debug)]
pub struct JsonProgressStore {
    path: PathBuf,
    io: tokio::sync::Mutex<()>,
}

impl JsonProgressStore {
    /// Create a store writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: tokio::sync::Mutex::new(()),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ProgressStore for JsonProgressStore {
    async fn load_progress(&self) -> ProgressData {
        let _io = self.io.lock().await;
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no saved progress, starting fresh");
                return ProgressData::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read progress, starting fresh");
                return ProgressData::default();
            }
        };
        match serde_json::from_str::<ProgressData>(&contents) {
            Ok(progress) => {
                debug!(path = %self.path.display(), levels = progress.levels.len(), "progress loaded");
                progress
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "saved progress is corrupt, starting fresh");
                ProgressData::default()
            }
        }
    }

    async fn save_progress(&self, progress: &ProgressData) -> Result<(), PortError> {
        let mut stamped = progress.clone();
        stamped.saved_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(&stamped).map_err(|e| PortError::Serialization {
            message: e.to_string(),
        })?;

        let _io = self.io.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), total_score = stamped.total_score, "progress saved");
        Ok(())
    }
}

/// Keeps progress in memory. Used by tests and when no save path is wanted.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    saved: Mutex<Option<ProgressData>>,
}

impl MemoryProgressStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `progress`.
    pub fn with_progress(progress: ProgressData) -> Self {
        Self {
            saved: Mutex::new(Some(progress)),
        }
    }

    /// The last saved value, if any.
    pub fn saved(&self) -> Option<ProgressData> {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load_progress(&self) -> ProgressData {
        self.saved().unwrap_or_default()
    }

    async fn save_progress(&self, progress: &ProgressData) -> Result<(), PortError> {
        let mut stamped = progress.clone();
        stamped.saved_at = Some(Utc::now());
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(stamped);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProgressStore::new(dir.path().join("saves").join("progress.json"));

        let mut progress = ProgressData::default();
        progress.record_run(0, 120, 4.5, 2.0);
        progress.unlock_next(0);
        store.save_progress(&progress).await.unwrap();

        let loaded = store.load_progress().await;
        assert_eq!(loaded.total_score, progress.total_score);
        assert!(loaded.is_unlocked(1));
        assert!(loaded.saved_at.is_some());
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProgressStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load_progress().await, ProgressData::default());
    }

    #[tokio::test]
    async fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonProgressStore::new(&path);

        let loaded = store.load_progress().await;

        assert_eq!(loaded, ProgressData::default());
        assert!(loaded.is_unlocked(0));
    }

    #[tokio::test]
    async fn memory_store_keeps_last_save() {
        let store = MemoryProgressStore::new();
        assert_eq!(store.load_progress().await, ProgressData::default());

        let mut progress = ProgressData::default();
        progress.record_run(0, 30, 1.0, 1.0);
        store.save_progress(&progress).await.unwrap();

        assert_eq!(store.load_progress().await.total_score, progress.total_score);
    }
}
