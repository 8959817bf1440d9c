//! Patch application against a working tree.
//!
//! The pipeline per file: resolve the target through the tree guard, read it
//! once, run every hunk through the matcher with a running offset, then (in
//! real mode only) snapshot and atomically replace. Per-hunk outcomes are
//! always collected, never thrown — a bad hunk cannot silently drop the rest
//! of a multi-file patch.

pub mod applier;
pub mod backup;
pub mod matcher;
pub mod report;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::diff::{NewlineStyle, Patch};
use crate::safety::{SafetyError, TreeGuard};

pub use backup::{BackupError, BackupManager, BackupRecord};
pub use matcher::{locate, Confidence, HunkMatch, MatchConfig};
pub use report::{ApplyResult, ApplySummary, FileReport, HunkReport, OutcomeCounts, RejectReason};

/// Whether an apply pass mutates the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Compute and report outcomes; touch nothing on disk.
    DryRun,
    /// Snapshot and mutate.
    Real,
}

/// Configuration for one apply pass.
#[derive(Debug, Clone)]
pub struct ApplyConfig {
    /// Maximum line-offset drift tolerated when re-locating a hunk.
    pub fuzz_window: usize,
    /// Ignore per-line leading/trailing whitespace during the fuzzy search.
    pub relax_whitespace: bool,
    /// Stop the whole pass at the first rejected hunk.
    pub abort_on_reject: bool,
    /// Render a unified-diff preview for every changed file.
    pub generate_preview: bool,
    /// Snapshot store, relative to the tree root.
    pub backups_dir: PathBuf,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            fuzz_window: 5,
            relax_whitespace: false,
            abort_on_reject: false,
            generate_preview: true,
            backups_dir: PathBuf::from(".driftpatch/backups"),
        }
    }
}

/// Errors fatal to an apply pass. Per-hunk misses are not errors; they are
/// [`ApplyResult::Rejected`] entries in the summary.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("{path} changed between match and commit")]
    ChangedDuringApply { path: PathBuf },
}

/// Apply `patch` to the tree rooted at `tree_root`.
///
/// In [`ApplyMode::DryRun`] no file is touched and no snapshot is taken; the
/// returned summary is exactly what a real pass would do. In
/// [`ApplyMode::Real`] each changed file is snapshotted before its first
/// mutation and replaced atomically, so cancellation between files leaves
/// every committed file whole and every pending file untouched.
pub fn apply(
    patch: &Patch,
    tree_root: &Path,
    mode: ApplyMode,
    config: &ApplyConfig,
) -> Result<ApplySummary, ApplyError> {
    let mut guard = TreeGuard::new(tree_root);
    guard.protect(&config.backups_dir);
    let mut backups = BackupManager::new(tree_root.join(&config.backups_dir));
    let match_config = MatchConfig {
        fuzz_window: config.fuzz_window,
        relax_whitespace: config.relax_whitespace,
    };

    let mut summary = ApplySummary::default();

    for file_diff in &patch.files {
        let target = guard.resolve(&file_diff.path)?;

        let (content, existed) = match fs::read_to_string(&target) {
            Ok(content) => (content, true),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                (String::new(), false)
            }
            Err(source) => {
                return Err(ApplyError::Io {
                    path: file_diff.path.clone(),
                    source,
                })
            }
        };
        let read_hash = xxh3_64(content.as_bytes());
        let style = if existed && !content.is_empty() {
            NewlineStyle::detect(&content)
        } else {
            file_diff.newline
        };
        let trailing_newline = if existed && !content.is_empty() {
            content.ends_with('\n')
        } else {
            true
        };

        let original_lines = applier::split_lines(&content);
        let mut lines = original_lines.clone();
        let pass = applier::apply_hunks(
            &file_diff.hunks,
            &mut lines,
            &match_config,
            config.abort_on_reject,
        );

        let changed = lines != original_lines;
        let preview = if config.generate_preview && changed {
            Some(report::render_preview(
                &file_diff.path,
                &original_lines,
                &lines,
            ))
        } else {
            None
        };

        let mut backed_up = false;
        if mode == ApplyMode::Real && changed && pass.aborted.is_none() {
            if existed {
                backups.ensure(&file_diff.path, &content)?;
                backed_up = true;

                // The match phase worked on an in-memory read; refuse to
                // commit over content that moved underneath it.
                let on_disk = fs::read(&target).map_err(|source| ApplyError::Io {
                    path: file_diff.path.clone(),
                    source,
                })?;
                if xxh3_64(&on_disk) != read_hash {
                    return Err(ApplyError::ChangedDuringApply {
                        path: file_diff.path.clone(),
                    });
                }
            } else if target.exists() {
                return Err(ApplyError::ChangedDuringApply {
                    path: file_diff.path.clone(),
                });
            }

            let output = applier::join_lines(&lines, style, trailing_newline);
            applier::write_atomic(&target, output.as_bytes()).map_err(|source| ApplyError::Io {
                path: file_diff.path.clone(),
                source,
            })?;
            debug!(file = %file_diff.path.display(), "committed");
        }

        let aborted = pass.aborted;
        summary.files.push(FileReport {
            path: file_diff.path.clone(),
            hunks: pass.reports,
            changed,
            backed_up,
            preview,
        });

        if let Some(hunk) = aborted {
            warn!(file = %file_diff.path.display(), hunk, "apply aborted on rejection");
            summary.aborted_at = Some((file_diff.path.clone(), hunk));
            break;
        }
    }

    Ok(summary)
}
