//! Deterministic tree walk, chunked reads, atomic directory rename and
//! recursive delete. Every blocking point in the engine funnels through here.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, StrongroomError};

/// A regular file found under a backup root, with its path normalized to
/// forward slashes relative to that root.
pub struct WalkEntry {
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// Walk `root`, yielding every regular file sorted lexicographically by its
/// POSIX-style relative path. Symlinks and other non-regular entries are
/// skipped rather than followed or erroring out.
pub fn walk(root: &Path) -> Result<Vec<WalkEntry>> {
    let mut entries = Vec::new();

    for dent in WalkDir::new(root).follow_links(false).into_iter() {
        let dent = dent.map_err(|err| {
            std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
        })?;

        let file_type = dent.file_type();
        if !file_type.is_file() {
            continue;
        }

        let rel = dent
            .path()
            .strip_prefix(root)
            .unwrap_or(dent.path())
            .to_path_buf();

        let relative_path = path_to_posix(&rel);

        entries.push(WalkEntry {
            relative_path,
            absolute_path: dent.path().to_path_buf(),
        });
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(entries)
}

fn path_to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read `path` in successive blocks of exactly `chunk_size` bytes, with the
/// final block possibly shorter. An empty file yields no blocks at all.
pub fn read_chunks(path: &Path, chunk_size: usize) -> Result<Vec<Vec<u8>>> {
    let mut file = fs::File::open(path)?;
    let mut chunks = Vec::new();

    loop {
        let mut buf = vec![0u8; chunk_size];
        let mut filled = 0;

        while filled < chunk_size {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            break;
        }

        buf.truncate(filled);
        let is_short = filled < chunk_size;
        chunks.push(buf);
        if is_short {
            break;
        }
    }

    Ok(chunks)
}

/// Create parent directories as needed and write `data` to `path`.
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

/// Rename `from` to `to`, both within the same store directory. `rename(2)`
/// on a single filesystem is atomic with respect to concurrent readers:
/// they observe either the old name or the new one, never a half-state.
pub fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(StrongroomError::from)
}

/// Recursively remove `path`. Idempotent: a missing target is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
