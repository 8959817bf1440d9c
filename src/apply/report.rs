//! Apply outcome aggregation.
//!
//! Everything in this module is data: per-hunk outcomes, per-file reports,
//! and the summary a dry-run shows before a real apply is confirmed. One bad
//! hunk never throws; it is recorded and its siblings keep going.

use std::fmt;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use super::matcher::Confidence;

/// Why a hunk was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No position inside the fuzz window matched the hunk's context.
    NoContextMatch,
}

/// Outcome for a single hunk. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "ApplyResult should be recorded in a report"]
pub enum ApplyResult {
    /// Applied at its expected position. `at_line` is 1-based.
    Applied { at_line: usize },
    /// The post-apply content was already present; nothing was changed.
    AlreadyApplied,
    /// Applied `offset` lines away from the expected position.
    FuzzyApplied { offset: isize, confidence: Confidence },
    /// Not applied; the reason says why.
    Rejected { reason: RejectReason },
}

impl fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyResult::Applied { at_line } => write!(f, "applied at line {at_line}"),
            ApplyResult::AlreadyApplied => write!(f, "already applied"),
            ApplyResult::FuzzyApplied { offset, confidence } => {
                let how = match confidence {
                    Confidence::Exact => "exact",
                    Confidence::WhitespaceRelaxed => "whitespace-relaxed",
                };
                write!(f, "fuzzy-applied at offset {offset:+} ({how})")
            }
            ApplyResult::Rejected { reason } => match reason {
                RejectReason::NoContextMatch => write!(f, "rejected (no context match)"),
            },
        }
    }
}

/// Outcome for one hunk plus its nearest-candidate similarity, a diagnostic
/// for rejected hunks (1.0 for anything that matched).
#[derive(Debug, Clone, PartialEq)]
pub struct HunkReport {
    pub index: usize,
    pub result: ApplyResult,
    pub similarity: f64,
}

/// Everything that happened to one file of the patch.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub hunks: Vec<HunkReport>,
    /// Whether the apply produced content different from what was read.
    pub changed: bool,
    /// Whether a snapshot was captured for this file (real mode only).
    pub backed_up: bool,
    /// Rendered unified diff of the pending change, when requested.
    pub preview: Option<String>,
}

impl FileReport {
    pub fn rejected_hunks(&self) -> impl Iterator<Item = &HunkReport> {
        self.hunks
            .iter()
            .filter(|h| matches!(h.result, ApplyResult::Rejected { .. }))
    }
}

/// Aggregate outcome counts across a whole patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutcomeCounts {
    pub applied: usize,
    pub already_applied: usize,
    pub fuzzy_applied: usize,
    pub rejected: usize,
}

/// Per-file, per-hunk results plus aggregate counts for one apply pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplySummary {
    pub files: Vec<FileReport>,
    /// Set when abort-on-reject stopped the pass: the offending file and
    /// hunk index. Later files and hunks were not attempted.
    pub aborted_at: Option<(PathBuf, usize)>,
}

impl ApplySummary {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for file in &self.files {
            for hunk in &file.hunks {
                match hunk.result {
                    ApplyResult::Applied { .. } => counts.applied += 1,
                    ApplyResult::AlreadyApplied => counts.already_applied += 1,
                    ApplyResult::FuzzyApplied { .. } => counts.fuzzy_applied += 1,
                    ApplyResult::Rejected { .. } => counts.rejected += 1,
                }
            }
        }
        counts
    }

    /// True when nothing was rejected and nothing aborted.
    pub fn is_clean(&self) -> bool {
        self.aborted_at.is_none() && self.counts().rejected == 0
    }
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            let status = if file.changed { "changed" } else { "unchanged" };
            writeln!(f, "{} ({status})", file.path.display())?;
            for hunk in &file.hunks {
                if matches!(hunk.result, ApplyResult::Rejected { .. }) {
                    writeln!(
                        f,
                        "  hunk {}: {} [closest candidate {:.0}%]",
                        hunk.index,
                        hunk.result,
                        hunk.similarity * 100.0
                    )?;
                } else {
                    writeln!(f, "  hunk {}: {}", hunk.index, hunk.result)?;
                }
            }
        }
        let counts = self.counts();
        write!(
            f,
            "applied {}, already applied {}, fuzzy {}, rejected {}",
            counts.applied, counts.already_applied, counts.fuzzy_applied, counts.rejected
        )?;
        if let Some((path, hunk)) = &self.aborted_at {
            write!(f, " (aborted at {} hunk {})", path.display(), hunk)?;
        }
        Ok(())
    }
}

/// Render the unified diff of a pending change for display.
pub(crate) fn render_preview(path: &Path, before: &[String], after: &[String]) -> String {
    let old = before.join("\n");
    let new = after.join("\n");
    let diff = TextDiff::from_lines(&old, &new);
    diff.unified_diff()
        .context_radius(3)
        .header(
            &format!("a/{}", path.display()),
            &format!("b/{}", path.display()),
        )
        .to_string()
}
