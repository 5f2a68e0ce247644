//! Orchestrates backup, verify, restore, and crash recovery across the fs
//! adapter, WAL, rollback protector, and Merkle aggregator. The one module
//! that has to get the ordering in `spec.md` §4.6 exactly right.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{Result, StrongroomError};
use crate::fs_adapter;
use crate::hashing::hash_bytes;
use crate::lock::StoreLock;
use crate::manifest::{FileRecord, Manifest};
use crate::merkle;
use crate::rollback::RootChain;
use crate::wal::WriteAheadLog;

/// A listed snapshot, as returned by [`SnapshotEngine::list_snapshots`].
#[derive(Debug, Clone)]
pub struct SnapshotSummary {
    pub id: String,
    pub label: String,
    pub timestamp: i64,
    pub file_count: usize,
    pub merkle_root: String,
}

pub struct SnapshotEngine {
    store: PathBuf,
    chunk_size: usize,
}

impl SnapshotEngine {
    pub fn open(store: impl Into<PathBuf>) -> Result<Self> {
        let store = store.into();
        let config = StoreConfig::load(&store)?;
        Ok(Self {
            store,
            chunk_size: config.chunk_size,
        })
    }

    pub fn with_chunk_size(store: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            store: store.into(),
            chunk_size,
        }
    }

    fn wal(&self) -> WriteAheadLog {
        WriteAheadLog::new(self.store.join("wal.log"))
    }

    fn root_chain(&self) -> RootChain {
        RootChain::new(self.store.join("roots.log"))
    }

    fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.store.join(id)
    }

    fn staging_dir(&self, id: &str) -> PathBuf {
        self.store.join(format!(".tmp_{id}"))
    }

    /// Run a backup of `source` into this store under `label`. `now_ms` is
    /// supplied by the caller so the allocated snapshot id is reproducible
    /// in tests.
    pub fn backup(&self, source: &Path, label: &str, now_ms: i64) -> Result<Manifest> {
        std::fs::create_dir_all(&self.store)?;
        let _lock = StoreLock::acquire(&self.store)?;

        self.cleanup_incomplete_snapshots()?;

        if !source.exists() {
            return Err(StrongroomError::SourceMissing(
                source.display().to_string(),
            ));
        }

        let snap_id = format!("{now_ms}_{label}");
        let staging = self.staging_dir(&snap_id);
        let chunks_dir = staging.join("chunks");

        self.wal().begin(&snap_id)?;

        let result = self.build_snapshot(source, label, now_ms, &snap_id, &staging, &chunks_dir);

        match result {
            Ok(manifest) => Ok(manifest),
            Err(err) => {
                // Once WAL.commit has been written, the snapshot is
                // committed regardless of whether the rename landed: remove
                // staging only for pre-commit failures, so a post-commit
                // rename failure leaves staging in place for
                // cleanup_incomplete_snapshots to retry on the next call.
                if !self.wal().committed_set()?.contains(snap_id.as_str()) {
                    fs_adapter::remove_dir_all(&staging)?;
                }
                Err(err)
            }
        }
    }

    fn build_snapshot(
        &self,
        source: &Path,
        label: &str,
        now_ms: i64,
        snap_id: &str,
        staging: &Path,
        chunks_dir: &Path,
    ) -> Result<Manifest> {
        let entries = fs_adapter::walk(source)?;

        if entries.is_empty() {
            return Err(StrongroomError::EmptySource(source.display().to_string()));
        }

        let mut manifest = Manifest::new(snap_id.to_string(), label.to_string(), now_ms);
        let mut written: HashSet<String> = HashSet::new();

        for entry in &entries {
            let blocks = fs_adapter::read_chunks(&entry.absolute_path, self.chunk_size)?;
            let mut chunk_ids = Vec::with_capacity(blocks.len());

            for block in blocks {
                let chunk_id = hash_bytes(&block);
                if written.insert(chunk_id.clone()) {
                    let chunk_path = chunks_dir.join(format!("{chunk_id}.chunk"));
                    if !chunk_path.exists() {
                        fs_adapter::write_file(&chunk_path, &block)?;
                    }
                }
                chunk_ids.push(chunk_id);
            }

            manifest.files.push(FileRecord {
                path: entry.relative_path.clone(),
                chunks: chunk_ids,
            });
        }

        manifest.merkle_root = merkle::compute_root(&manifest.leaves());

        fs_adapter::write_file(
            &staging.join("manifest.json"),
            manifest.to_json()?.as_bytes(),
        )?;

        // Root must be recorded before COMMIT: a crash between these two
        // writes leaves an orphan root that no verify call can ever observe
        // (nothing names it), superseded at the tip by the next backup.
        self.root_chain().append(&manifest.merkle_root)?;
        self.wal().commit(snap_id)?;

        let final_dir = self.snapshot_dir(snap_id);
        if let Err(err) = fs_adapter::atomic_rename(staging, &final_dir) {
            log::warn!("rename of staging snapshot {snap_id} failed: {err}");
            return Err(err);
        }

        Ok(manifest)
    }

    /// Verify a committed snapshot: rollback check, per-chunk integrity,
    /// and Merkle root recomputation. Read-only and idempotent.
    pub fn verify(&self, snapshot_id: &str) -> Result<Manifest> {
        let dir = self.snapshot_dir(snapshot_id);
        let manifest_path = dir.join("manifest.json");

        let content = std::fs::read_to_string(&manifest_path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StrongroomError::ManifestMissing(snapshot_id.to_string())
            } else {
                StrongroomError::Io(err)
            }
        })?;

        let manifest = Manifest::from_json(snapshot_id, &content)?;

        self.root_chain().verify(&manifest.merkle_root)?;

        let chunks_dir = dir.join("chunks");
        let mut missing = Vec::new();
        let mut corrupted = Vec::new();

        for chunk_id in manifest.leaves() {
            let chunk_path = chunks_dir.join(format!("{chunk_id}.chunk"));
            match std::fs::read(&chunk_path) {
                Ok(data) => {
                    if hash_bytes(&data) != chunk_id {
                        corrupted.push(chunk_id);
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    missing.push(chunk_id);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if !missing.is_empty() || !corrupted.is_empty() {
            return Err(StrongroomError::ChunksInvalid { missing, corrupted });
        }

        let computed = merkle::compute_root(&manifest.leaves());
        if computed != manifest.merkle_root {
            return Err(StrongroomError::MerkleMismatch {
                expected: manifest.merkle_root,
                computed,
            });
        }

        Ok(manifest)
    }

    /// Verify `snapshot_id`, then reconstruct every file under `target`.
    /// Never produces output from an unverified snapshot.
    pub fn restore(&self, snapshot_id: &str, target: &Path) -> Result<()> {
        let manifest = self.verify(snapshot_id)?;
        std::fs::create_dir_all(target)?;

        let chunks_dir = self.snapshot_dir(snapshot_id).join("chunks");

        for file in &manifest.files {
            let out_path = target.join(&file.path);
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut data = Vec::new();
            for chunk_id in &file.chunks {
                let chunk_path = chunks_dir.join(format!("{chunk_id}.chunk"));
                data.extend_from_slice(&std::fs::read(chunk_path)?);
            }
            std::fs::write(out_path, data)?;
        }

        Ok(())
    }

    /// Retry a stalled rename for every committed snapshot still stuck in
    /// staging, then sweep every staging directory and every directory not
    /// in the committed set.
    pub fn cleanup_incomplete_snapshots(&self) -> Result<usize> {
        if !self.store.exists() {
            return Ok(0);
        }

        let committed = self.wal().committed_set()?;
        let mut cleaned = 0;

        for snap_id in &committed {
            let final_dir = self.snapshot_dir(snap_id);
            let staging = self.staging_dir(snap_id);

            if !final_dir.exists() && staging.exists() {
                match fs_adapter::atomic_rename(&staging, &final_dir) {
                    Ok(()) => log::info!("recovered committed snapshot {snap_id} on rename retry"),
                    Err(err) => {
                        log::warn!("rename retry for {snap_id} failed again, dropping it: {err}");
                        fs_adapter::remove_dir_all(&staging)?;
                        cleaned += 1;
                    }
                }
            }
        }

        for entry in std::fs::read_dir(&self.store)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if !file_type.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let name = name.to_string_lossy();

            if name.starts_with(".tmp_") {
                fs_adapter::remove_dir_all(&entry.path())?;
                cleaned += 1;
                continue;
            }

            if !committed.contains(name.as_ref()) {
                fs_adapter::remove_dir_all(&entry.path())?;
                cleaned += 1;
            }
        }

        Ok(cleaned)
    }

    /// Clean up, then list every committed snapshot whose manifest parses,
    /// sorted by id.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>> {
        self.cleanup_incomplete_snapshots()?;

        let committed = self.wal().committed_set()?;
        let mut summaries = Vec::new();

        for id in committed {
            let manifest_path = self.snapshot_dir(&id).join("manifest.json");
            let content = match std::fs::read_to_string(&manifest_path) {
                Ok(content) => content,
                Err(_) => continue,
            };
            let manifest = match Manifest::from_json(&id, &content) {
                Ok(manifest) => manifest,
                Err(_) => continue,
            };

            summaries.push(SnapshotSummary {
                id: id.clone(),
                label: manifest.label,
                timestamp: manifest.timestamp,
                file_count: manifest.files.len(),
                merkle_root: manifest.merkle_root,
            });
        }

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}
