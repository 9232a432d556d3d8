use crate::{CappedToken, HypError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted ledger state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: i64,
    pub token: CappedToken,
}

/// JSON file store for ledger snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write the snapshot through a temp file so readers never see a partial file
    pub fn save(&self, token: &CappedToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: chrono::Utc::now().timestamp(),
            token: token.clone(),
        };
        let serialized = serde_json::to_vec_pretty(&snapshot)?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &serialized)
            .map_err(|e| HypError::Storage(format!("Failed to write {}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| HypError::Storage(format!("Failed to replace {}: {}", self.path.display(), e)))?;

        tracing::debug!(
            "Saved snapshot of {} ({} events) to {}",
            token.symbol(),
            token.events().len(),
            self.path.display()
        );
        Ok(())
    }

    /// Load and verify a snapshot
    pub fn load(&self) -> Result<CappedToken> {
        let data = fs::read(&self.path)
            .map_err(|e| HypError::Storage(format!("Failed to read {}: {}", self.path.display(), e)))?;

        let snapshot: Snapshot = serde_json::from_slice(&data)
            .map_err(|e| HypError::CorruptSnapshot(format!("Failed to parse snapshot: {}", e)))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(HypError::CorruptSnapshot(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        snapshot
            .token
            .verify_invariants()
            .map_err(|e| HypError::CorruptSnapshot(e.to_string()))?;

        tracing::debug!("Loaded snapshot from {}", self.path.display());
        Ok(snapshot.token)
    }
}
