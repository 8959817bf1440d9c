//! Pre-mutation snapshots.
//!
//! One snapshot per (file, session), captured before the file's first
//! mutating write and synced to disk before that write is allowed to
//! proceed. Snapshots are plain copies under the backup root, named
//! `<file>.bak.<timestamp>`, readable for manual rollback.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

/// A captured pre-mutation snapshot of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Tree-relative path of the file the snapshot was taken from.
    pub original_path: PathBuf,
    /// Absolute path of the stored snapshot.
    pub backup_path: PathBuf,
    pub captured_at: DateTime<Local>,
    /// xxh3 hash of the captured content.
    pub content_hash: u64,
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("failed to store backup for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Session-scoped snapshot store.
pub struct BackupManager {
    root: PathBuf,
    taken: HashMap<PathBuf, BackupRecord>,
}

impl BackupManager {
    /// Create a manager storing snapshots under `root`. Nothing is written
    /// until the first [`ensure`](Self::ensure) call, so a dry-run session
    /// leaves no trace on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            taken: HashMap::new(),
        }
    }

    /// Capture `content` as the snapshot for `rel` unless this session
    /// already holds one. The snapshot is written and synced before this
    /// returns; a failure here must abort the write it was guarding.
    pub fn ensure(&mut self, rel: &Path, content: &str) -> Result<&BackupRecord, BackupError> {
        let root = self.root.clone();
        match self.taken.entry(rel.to_path_buf()) {
            Entry::Occupied(existing) => Ok(existing.into_mut()),
            Entry::Vacant(slot) => {
                let captured_at = Local::now();
                let dir = match rel.parent() {
                    Some(parent) => root.join(parent),
                    None => root.clone(),
                };
                fs::create_dir_all(&dir).map_err(|source| BackupError::Io {
                    path: rel.to_path_buf(),
                    source,
                })?;
                let name = format!(
                    "{}.bak.{}",
                    rel.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "unnamed".to_string()),
                    captured_at.format("%Y%m%d-%H%M%S")
                );
                let backup_path = dir.join(name);
                write_durable(&backup_path, content.as_bytes()).map_err(|source| {
                    BackupError::Io {
                        path: rel.to_path_buf(),
                        source,
                    }
                })?;
                debug!(file = %rel.display(), backup = %backup_path.display(), "captured snapshot");
                Ok(slot.insert(BackupRecord {
                    original_path: rel.to_path_buf(),
                    backup_path,
                    captured_at,
                    content_hash: xxh3_64(content.as_bytes()),
                }))
            }
        }
    }

    /// The snapshot captured for `rel` this session, if any.
    pub fn record(&self, rel: &Path) -> Option<&BackupRecord> {
        self.taken.get(rel)
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }

    /// Enumerate all snapshots stored under `root`, across sessions.
    pub fn list(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    }
}

/// Write and sync so the snapshot survives a crash that interrupts the
/// mutation it guards.
fn write_durable(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}
