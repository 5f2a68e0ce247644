//! Append-only write-ahead log. `BEGIN <id>` marks the start of a backup,
//! `COMMIT <id>` its durable completion. The file is never rewritten or
//! truncated; a `BEGIN` with no matching `COMMIT` is the durable record of
//! an aborted backup.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;

pub struct WriteAheadLog {
    path: PathBuf,
}

impl WriteAheadLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn begin(&self, id: &str) -> Result<()> {
        self.append(&format!("BEGIN {id}"))
    }

    pub fn commit(&self, id: &str) -> Result<()> {
        self.append(&format!("COMMIT {id}"))
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// The set of ids that appear in any `COMMIT` line. A pure function of
    /// the file's current content; a missing file is an empty set.
    pub fn committed_set(&self) -> Result<HashSet<String>> {
        let mut committed = HashSet::new();

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(committed),
            Err(err) => return Err(err.into()),
        };

        for line in content.lines() {
            if let Some(id) = line.strip_prefix("COMMIT ") {
                committed.insert(id.to_string());
            }
        }

        Ok(committed)
    }
}
