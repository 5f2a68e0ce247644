use thiserror::Error;

/// All failure modes the engine can surface, matching the error kinds each
/// subsystem is specified to raise.
#[derive(Error, Debug)]
pub enum StrongroomError {
    #[error("source path does not exist: {0}")]
    SourceMissing(String),

    #[error("source tree is empty: {0}")]
    EmptySource(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot {0} has no manifest")]
    ManifestMissing(String),

    #[error("failed to parse manifest for snapshot {0}: {1}")]
    ManifestParse(String, serde_json::Error),

    #[error(
        "{} chunk(s) missing, {} chunk(s) corrupted (showing up to 5 of each): missing={:?} corrupted={:?}",
        missing.len(), corrupted.len(), &missing[..missing.len().min(5)], &corrupted[..corrupted.len().min(5)]
    )]
    ChunksInvalid {
        missing: Vec<String>,
        corrupted: Vec<String>,
    },

    #[error("merkle root mismatch: manifest says {expected}, recomputed {computed}")]
    MerkleMismatch { expected: String, computed: String },

    #[error("rollback detected: {reason}")]
    Rollback { reason: String },

    #[error("audit chain broken at line {line}")]
    AuditChainBroken { line: usize },

    #[error("audit entry hash mismatch at line {line}")]
    AuditHashMismatch { line: usize },

    #[error("audit log truncated: expected at least {expected} entries, found {found}")]
    AuditTruncated { expected: usize, found: usize },

    #[error("user '{user}' is not permitted to run '{command}'")]
    PolicyDeny { user: String, command: String },

    #[error("invalid policy file: {0}")]
    PolicyParse(String),

    #[error("invalid store configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("store at {0} is locked by another process")]
    StoreLocked(String),
}

pub type Result<T> = std::result::Result<T, StrongroomError>;
