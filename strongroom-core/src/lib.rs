//! Content-addressed, crash-safe, tamper-evident backup engine.
//!
//! A store directory holds per-snapshot subdirectories, a write-ahead log, a
//! root chain, and an audit log. Backups are content-addressed at chunk
//! granularity, proven by a Merkle root, and protected against silent
//! rollback by a monotonic root chain. Every administrative action is
//! recorded in an append-only hash-chained audit log.
//!
//! The store assumes a single writer; see [`snapshot::SnapshotEngine`] for
//! the orchestration of backup/verify/restore and crash recovery.

pub mod audit;
pub mod config;
pub mod error;
pub mod fs_adapter;
pub mod hashing;
pub mod lock;
pub mod manifest;
pub mod merkle;
pub mod policy;
pub mod rollback;
pub mod snapshot;
pub mod wal;

pub use audit::{AuditLog, STATUS_DENY, STATUS_FAIL, STATUS_OK};
pub use config::StoreConfig;
pub use error::{Result, StrongroomError};
pub use lock::StoreLock;
pub use manifest::{FileRecord, Manifest};
pub use policy::PolicyFile;
pub use rollback::RootChain;
pub use snapshot::{SnapshotEngine, SnapshotSummary};
pub use wal::WriteAheadLog;
