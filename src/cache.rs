//! Snapshot persistence as a single JSON cache file
//!
//! The entire persisted state is one snapshot, replaced wholesale on every
//! sync. Saves go through a sibling temp file and an atomic rename so a
//! failed sync can never leave a half-written file where the previous good
//! snapshot used to be.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::github::{PullRequest, Repository};

/// Point-in-time capture of everything sync fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub pull_requests: Vec<PullRequest>,
}

/// Errors from the snapshot store
#[derive(Debug, Error)]
pub enum CacheError {
    /// No cache file exists yet; `repodex sync` has never completed
    #[error("no snapshot cache at {path} (run `repodex sync` first)")]
    NotFound { path: PathBuf },

    /// The cache file exists but does not decode as a snapshot
    #[error("snapshot cache at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loads and saves the one snapshot cache file
pub struct SnapshotStore {
    path: PathBuf,
    cached: Option<Snapshot>,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, cached: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, reading the file only on the first call
    pub fn load(&mut self) -> Result<&Snapshot, CacheError> {
        if let Some(ref snapshot) = self.cached {
            return Ok(snapshot);
        }

        let bytes = std::fs::read(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CacheError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                CacheError::Io {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;

        let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupt {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(
            "Loaded snapshot from {}: {} repositories, {} pull requests",
            self.path.display(),
            snapshot.repositories.len(),
            snapshot.pull_requests.len()
        );

        Ok(self.cached.insert(snapshot))
    }

    /// Persist a snapshot, replacing any prior content atomically
    pub fn save(&mut self, snapshot: Snapshot) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let data = serde_json::to_vec_pretty(&snapshot).map_err(CacheError::Serialize)?;

        // Sibling path keeps the rename on one filesystem
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, data).map_err(|e| CacheError::Io {
            path: temp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        debug!("Saved snapshot to {}", self.path.display());
        self.cached = Some(snapshot);
        Ok(())
    }
}
