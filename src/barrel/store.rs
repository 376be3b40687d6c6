//! Snapshot persistence for the barrel record set.
//!
//! Only the raw records are written; every derived map is rebuilt by replay
//! at load. The file is rewritten in full on each mutation, guarded by its
//! own lock so saving is never nested inside the index lock. Persistence
//! failures are logged and the in-memory state stays authoritative.

use crate::site::SiteRecord;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct SnapshotStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(data_dir: &str, barrel_id: u32) -> Self {
        Self {
            path: Path::new(data_dir).join(format!("barrel_{}.json", barrel_id)),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites the snapshot file with the full record set.
    pub fn save(&self, records: &HashMap<String, SiteRecord>) {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::error!("Failed to create data dir {}: {}", parent.display(), e);
            return;
        }

        match serde_json::to_string_pretty(records) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    tracing::error!("Failed to write snapshot {}: {}", self.path.display(), e);
                } else {
                    tracing::debug!("Snapshot saved ({} records) to {}", records.len(), self.path.display());
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize snapshot: {}", e);
            }
        }
    }

    /// Loads the persisted record set. A missing file is an empty barrel,
    /// not an error. An unreadable file is logged and treated as empty; the
    /// file is left in place for manual recovery.
    pub fn load(&self) -> HashMap<String, SiteRecord> {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());

        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No snapshot at {}, starting empty", self.path.display());
                return HashMap::new();
            }
            Err(e) => {
                tracing::error!("Failed to read snapshot {}: {}", self.path.display(), e);
                return HashMap::new();
            }
        };

        match serde_json::from_str::<HashMap<String, SiteRecord>>(&raw) {
            Ok(records) => {
                tracing::info!("Loaded {} records from {}", records.len(), self.path.display());
                records
            }
            Err(e) => {
                tracing::error!(
                    "Snapshot {} is unreadable, starting empty: {}",
                    self.path.display(),
                    e
                );
                HashMap::new()
            }
        }
    }
}
