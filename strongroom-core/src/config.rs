//! Per-store configuration. Kept deliberately small: the only knob the core
//! actually needs is the chunk size used when splitting files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoreConfig {
    pub chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StoreConfig {
    /// Read `store.json` from inside `store_dir`, falling back to defaults
    /// when the file is absent (a freshly initialized store has none yet).
    pub fn load(store_dir: &Path) -> Result<Self> {
        let path = store_dir.join("store.json");
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, store_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(store_dir)?;
        let path = store_dir.join("store.json");
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
