//! Hash-chained log of administrative actions, with a companion roots file
//! that lets `audit_verify` detect suffix truncation even when every
//! remaining line still links up correctly.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Result, StrongroomError};
use crate::hashing::{hash_string, ZERO_HASH};

pub const STATUS_OK: &str = "OK";
pub const STATUS_FAIL: &str = "FAIL";
pub const STATUS_DENY: &str = "DENY";

pub struct AuditLog {
    path: PathBuf,
    roots_path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let roots_path = match path.parent() {
            Some(parent) => parent.join("audit_roots.log"),
            None => PathBuf::from("audit_roots.log"),
        };
        Self { path, roots_path }
    }

    fn last_entry_hash(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content
                .lines()
                .last()
                .and_then(|line| line.split_whitespace().next())
                .map(str::to_string)
                .unwrap_or_else(|| ZERO_HASH.to_string())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ZERO_HASH.to_string()),
            Err(err) => Err(err.into()),
        }
    }

    /// Append one entry and record its tip in the roots file. `ts_ms` is
    /// passed in rather than sampled internally so callers (and tests) fully
    /// control determinism.
    pub fn log(&self, user: &str, command: &str, args_str: &str, status: &str, ts_ms: i64) -> Result<String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let prev = self.last_entry_hash()?;
        let args_hash = hash_string(args_str);
        let raw = format!("{prev} {ts_ms} {user} {command} {args_hash} {status}");
        let entry_hash = hash_string(&raw);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{entry_hash} {raw}")?;
        drop(file);

        let count = std::fs::read_to_string(&self.path)?.lines().count();

        let mut roots_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.roots_path)?;
        writeln!(roots_file, "{count} {entry_hash}")?;

        Ok(entry_hash)
    }
}

/// Verify the hash chain of `path` and, if a companion roots file sits next
/// to it, check that the log has not been truncated.
pub fn audit_verify(path: &std::path::Path) -> Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    let lines: Vec<&str> = content.lines().collect();

    let mut prev_chain = ZERO_HASH.to_string();
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 7 {
            return Err(StrongroomError::AuditChainBroken { line: line_no });
        }

        let entry_hash = parts[0];
        let prev_in_entry = parts[1];

        if prev_chain != prev_in_entry {
            return Err(StrongroomError::AuditChainBroken { line: line_no });
        }

        let raw = parts[1..].join(" ");
        if hash_string(&raw) != entry_hash {
            return Err(StrongroomError::AuditHashMismatch { line: line_no });
        }

        prev_chain = entry_hash.to_string();
    }

    let roots_path = match path.parent() {
        Some(parent) => parent.join("audit_roots.log"),
        None => PathBuf::from("audit_roots.log"),
    };

    if let Ok(roots_content) = std::fs::read_to_string(&roots_path) {
        if let Some(last) = roots_content.lines().last() {
            let parts: Vec<&str> = last.split_whitespace().collect();
            if parts.len() >= 2 {
                let expected_count: usize = parts[0].parse().unwrap_or(0);
                let expected_hash = parts[1];

                if lines.len() < expected_count {
                    return Err(StrongroomError::AuditTruncated {
                        expected: expected_count,
                        found: lines.len(),
                    });
                }

                if lines.len() == expected_count && prev_chain != expected_hash {
                    return Err(StrongroomError::AuditHashMismatch { line: lines.len() });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_entry_chains_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log"));
        log.log("alice", "backup", "src label", STATUS_OK, 1000).unwrap();
        assert!(audit_verify(&dir.path().join("audit.log")).is_ok());
    }

    #[test]
    fn chain_of_k_commands_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log"));
        for i in 0..5 {
            log.log("alice", "verify", &format!("snap{i}"), STATUS_OK, 1000 + i)
                .unwrap();
        }
        assert!(audit_verify(&dir.path().join("audit.log")).is_ok());
    }

    #[test]
    fn altering_a_byte_breaks_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(&path);
        log.log("alice", "backup", "a b", STATUS_OK, 1).unwrap();
        log.log("alice", "verify", "snap1", STATUS_OK, 2).unwrap();

        let mut content = std::fs::read_to_string(&path).unwrap();
        content = content.replacen("alice", "mallory", 1);
        std::fs::write(&path, content).unwrap();

        assert!(audit_verify(&path).is_err());
    }

    #[test]
    fn truncating_suffix_while_keeping_roots_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(&path);
        for i in 0..5 {
            log.log("alice", "verify", &format!("snap{i}"), STATUS_OK, i).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let truncated: String = content.lines().take(3).collect::<Vec<_>>().join("\n") + "\n";
        std::fs::write(&path, truncated).unwrap();

        match audit_verify(&path) {
            Err(StrongroomError::AuditTruncated { expected, found }) => {
                assert_eq!(expected, 5);
                assert_eq!(found, 3);
            }
            other => panic!("expected truncation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_log_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(audit_verify(&dir.path().join("audit.log")).is_ok());
    }
}
