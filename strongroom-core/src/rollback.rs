//! Append-only monotonic root chain. Its tip is the only root any verify
//! call accepts; presenting an older (but otherwise valid) root is rollback.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Result, StrongroomError};

pub struct RootChain {
    path: PathBuf,
}

impl RootChain {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn lines(&self) -> Result<Vec<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Append `root` with `idx = current_line_count + 1`.
    pub fn append(&self, root: &str) -> Result<()> {
        let idx = self.lines()?.len() + 1;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{idx} {root}")?;
        Ok(())
    }

    /// OK iff the chain is non-empty and its last line's root equals `root`.
    /// Any other outcome — missing file, empty file, tip mismatch — is a
    /// rollback failure, even if `root` appears earlier in the chain.
    pub fn verify(&self, root: &str) -> Result<()> {
        let lines = self.lines()?;

        let last = match lines.last() {
            Some(last) => last,
            None => {
                return Err(StrongroomError::Rollback {
                    reason: "root chain is empty".to_string(),
                })
            }
        };

        let last_root = last
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| StrongroomError::Rollback {
                reason: "malformed root chain entry".to_string(),
            })?;

        if last_root != root {
            return Err(StrongroomError::Rollback {
                reason: format!("{root} is not the latest root (tip is {last_root})"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verify_against_missing_chain_fails() {
        let dir = tempfile::tempdir().unwrap();
        let chain = RootChain::new(dir.path().join("roots.log"));
        assert!(chain.verify("deadbeef").is_err());
    }

    #[test]
    fn append_then_verify_tip_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let chain = RootChain::new(dir.path().join("roots.log"));
        chain.append("root1").unwrap();
        chain.append("root2").unwrap();
        assert!(chain.verify("root2").is_ok());
    }

    #[test]
    fn older_root_is_rollback_even_if_once_valid() {
        let dir = tempfile::tempdir().unwrap();
        let chain = RootChain::new(dir.path().join("roots.log"));
        chain.append("root1").unwrap();
        chain.append("root2").unwrap();
        assert!(chain.verify("root1").is_err());
    }

    #[test]
    fn indices_are_one_based_and_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roots.log");
        let chain = RootChain::new(&path);
        chain.append("root1").unwrap();
        chain.append("root2").unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw.lines().collect::<Vec<_>>(),
            vec!["1 root1", "2 root2"]
        );
    }
}
