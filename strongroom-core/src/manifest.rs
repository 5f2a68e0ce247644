//! Per-snapshot descriptor: which files exist, which chunks make each one up,
//! and the Merkle root that proves it. Serializes to the exact JSON schema
//! fixed in the store layout (`snapshot_id`, `label`, `timestamp`, `files`,
//! `merkle_root`).

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrongroomError};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub chunks: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Manifest {
    pub snapshot_id: String,
    pub label: String,
    pub timestamp: i64,
    /// Sorted by `path` — required for the Merkle root of equal trees to be
    /// deterministic across runs.
    pub files: Vec<FileRecord>,
    pub merkle_root: String,
}

impl Manifest {
    pub fn new(snapshot_id: String, label: String, timestamp: i64) -> Self {
        Self {
            snapshot_id,
            label,
            timestamp,
            files: Vec::new(),
            merkle_root: String::new(),
        }
    }

    /// Flattened chunk id sequence in manifest order: `files` order, then
    /// each file's chunks in order. This is the leaf sequence the Merkle
    /// aggregator consumes.
    pub fn leaves(&self) -> Vec<String> {
        self.files
            .iter()
            .flat_map(|f| f.chunks.iter().cloned())
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| StrongroomError::ManifestParse(self.snapshot_id.clone(), err))
    }

    pub fn from_json(snapshot_id: &str, content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|err| StrongroomError::ManifestParse(snapshot_id.to_string(), err))
    }
}
