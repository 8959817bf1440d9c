//! In-memory hunk application and atomic file replacement.
//!
//! All mutation funnels through [`write_atomic`]: tempfile in the target's
//! directory + fsync + rename, so a file is never observed half-written and
//! an abort at any point leaves the original intact.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::diff::{Hunk, NewlineStyle};

use super::matcher::{locate, HunkMatch, MatchConfig};
use super::report::{ApplyResult, HunkReport, RejectReason};

/// Split file content into terminator-free lines. Empty content is an empty
/// file, not one empty line.
pub(crate) fn split_lines(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    content
        .split_inclusive('\n')
        .map(|raw| {
            raw.strip_suffix("\r\n")
                .or_else(|| raw.strip_suffix('\n'))
                .unwrap_or(raw)
                .to_string()
        })
        .collect()
}

/// Reassemble lines with a uniform newline style, restoring the original
/// trailing-newline presence.
pub(crate) fn join_lines(lines: &[String], style: NewlineStyle, trailing_newline: bool) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join(style.as_str());
    if trailing_newline {
        out.push_str(style.as_str());
    }
    out
}

/// Result of running all of a file's hunks against its current lines.
pub(crate) struct HunkPass {
    pub reports: Vec<HunkReport>,
    /// Index of the hunk that tripped abort-on-reject, if any. Hunks after
    /// it were not attempted.
    pub aborted: Option<usize>,
}

/// Apply `hunks` to `lines` in ascending original order.
///
/// Maintains the running offset: line-count deltas of hunks applied this
/// pass plus fuzzy drift discovered along the way. AlreadyApplied and
/// Rejected hunks contribute nothing, so a rejection cannot poison the
/// positions of its siblings.
pub(crate) fn apply_hunks(
    hunks: &[Hunk],
    lines: &mut Vec<String>,
    config: &MatchConfig,
    abort_on_reject: bool,
) -> HunkPass {
    let mut reports = Vec::with_capacity(hunks.len());
    let mut applied_delta: isize = 0;
    let mut drift: isize = 0;

    for (index, hunk) in hunks.iter().enumerate() {
        // Zero-count ranges record the line *before* the change, so they
        // already are 0-based insertion points.
        let raw_pre = if hunk.old_count == 0 {
            hunk.old_start as isize
        } else {
            hunk.old_start as isize - 1
        };
        let raw_post = if hunk.new_count == 0 {
            hunk.new_start as isize
        } else {
            hunk.new_start as isize - 1
        };
        let pre_pos = raw_pre + applied_delta + drift;
        // `new_start` already encodes every earlier hunk's delta, so the
        // post-apply position only needs this session's drift.
        let post_pos = raw_post + drift;

        let matched = locate(hunk, lines, pre_pos, post_pos, raw_pre - pre_pos, config);
        let (result, similarity) = match matched {
            HunkMatch::Exact { at } => {
                splice(lines, at, hunk);
                applied_delta += hunk.net_delta();
                (ApplyResult::Applied { at_line: at + 1 }, 1.0)
            }
            HunkMatch::AlreadyApplied => (ApplyResult::AlreadyApplied, 1.0),
            HunkMatch::Fuzzy {
                at,
                offset,
                confidence,
            } => {
                debug!(hunk = index, offset, "hunk drifted; applying fuzzily");
                splice(lines, at, hunk);
                applied_delta += hunk.net_delta();
                drift += offset;
                (ApplyResult::FuzzyApplied { offset, confidence }, 1.0)
            }
            HunkMatch::NoMatch { similarity } => (
                ApplyResult::Rejected {
                    reason: RejectReason::NoContextMatch,
                },
                similarity,
            ),
        };

        let rejected = matches!(result, ApplyResult::Rejected { .. });
        reports.push(HunkReport {
            index,
            result,
            similarity,
        });
        if rejected && abort_on_reject {
            warn!(hunk = index, "rejected hunk aborted the apply");
            return HunkPass {
                reports,
                aborted: Some(index),
            };
        }
    }

    HunkPass {
        reports,
        aborted: None,
    }
}

fn splice(lines: &mut Vec<String>, at: usize, hunk: &Hunk) {
    let old_len = hunk.old_lines().count();
    let replacement: Vec<String> = hunk.new_lines().map(str::to_string).collect();
    lines.splice(at..at + old_len, replacement);
}

/// Atomic file write: tempfile + fsync + rename, then an mtime touch so
/// downstream incremental tooling notices the change.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse;

    fn lines_of(content: &str) -> Vec<String> {
        split_lines(content)
    }

    #[test]
    fn split_and_join_preserve_trailing_newline() {
        let lines = split_lines("a\nb\n");
        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(join_lines(&lines, NewlineStyle::Lf, true), "a\nb\n");

        let bare = split_lines("a\nb");
        assert_eq!(bare, vec!["a", "b"]);
        assert_eq!(join_lines(&bare, NewlineStyle::Lf, false), "a\nb");
    }

    #[test]
    fn split_normalizes_mixed_endings() {
        assert_eq!(split_lines("a\r\nb\nc\r\n"), vec!["a", "b", "c"]);
        assert_eq!(split_lines(""), Vec::<String>::new());
    }

    #[test]
    fn join_respects_crlf() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(join_lines(&lines, NewlineStyle::Crlf, true), "a\r\nb\r\n");
    }

    #[test]
    fn later_hunks_see_earlier_deltas() {
        // First hunk grows the file by two lines; the second still lands
        // exactly because the running offset shifts its expected position.
        let patch = parse(
            "--- a/f\n+++ b/f\n\
             @@ -1,1 +1,3 @@\n one\n+x\n+y\n\
             @@ -4,1 +6,1 @@\n-four\n+FOUR\n",
        )
        .unwrap();
        let mut lines = lines_of("one\ntwo\nthree\nfour\n");
        let pass = apply_hunks(
            &patch.files[0].hunks,
            &mut lines,
            &MatchConfig::default(),
            false,
        );
        assert_eq!(
            pass.reports[0].result,
            ApplyResult::Applied { at_line: 1 }
        );
        assert_eq!(
            pass.reports[1].result,
            ApplyResult::Applied { at_line: 6 }
        );
        assert_eq!(lines, vec!["one", "x", "y", "two", "three", "FOUR"]);
    }

    #[test]
    fn rejected_hunk_does_not_shift_siblings() {
        let patch = parse(
            "--- a/f\n+++ b/f\n\
             @@ -1,1 +1,2 @@\n-missing\n+a\n+b\n\
             @@ -3,1 +4,1 @@\n-three\n+THREE\n",
        )
        .unwrap();
        let mut lines = lines_of("one\ntwo\nthree\n");
        let pass = apply_hunks(
            &patch.files[0].hunks,
            &mut lines,
            &MatchConfig::default(),
            false,
        );
        assert!(matches!(
            pass.reports[0].result,
            ApplyResult::Rejected { .. }
        ));
        assert_eq!(
            pass.reports[1].result,
            ApplyResult::Applied { at_line: 3 }
        );
        assert_eq!(lines, vec!["one", "two", "THREE"]);
    }

    #[test]
    fn abort_on_reject_stops_the_pass() {
        let patch = parse(
            "--- a/f\n+++ b/f\n\
             @@ -1,1 +1,1 @@\n-missing\n+a\n\
             @@ -3,1 +3,1 @@\n-three\n+THREE\n",
        )
        .unwrap();
        let mut lines = lines_of("one\ntwo\nthree\n");
        let pass = apply_hunks(
            &patch.files[0].hunks,
            &mut lines,
            &MatchConfig::default(),
            true,
        );
        assert_eq!(pass.aborted, Some(0));
        assert_eq!(pass.reports.len(), 1);
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn drift_carries_forward_to_later_hunks() {
        // Both hunks drifted by the same two lines; the first discovers the
        // drift fuzzily, the second then matches exactly.
        let patch = parse(
            "--- a/f\n+++ b/f\n\
             @@ -1,1 +1,1 @@\n-one\n+ONE\n\
             @@ -3,1 +3,1 @@\n-three\n+THREE\n",
        )
        .unwrap();
        let mut lines = lines_of("pad\npad\none\ntwo\nthree\n");
        let pass = apply_hunks(
            &patch.files[0].hunks,
            &mut lines,
            &MatchConfig::default(),
            false,
        );
        assert!(matches!(
            pass.reports[0].result,
            ApplyResult::FuzzyApplied { offset: 2, .. }
        ));
        assert_eq!(
            pass.reports[1].result,
            ApplyResult::Applied { at_line: 5 }
        );
        assert_eq!(lines, vec!["pad", "pad", "ONE", "two", "THREE"]);
    }

    #[test]
    fn new_file_hunk_inserts_from_line_zero() {
        let patch = parse("--- a/f\n+++ b/f\n@@ -0,0 +1,2 @@\n+first\n+second\n").unwrap();
        let mut lines = Vec::new();
        let pass = apply_hunks(
            &patch.files[0].hunks,
            &mut lines,
            &MatchConfig::default(),
            false,
        );
        assert_eq!(pass.reports[0].result, ApplyResult::Applied { at_line: 1 });
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/file.txt");
        write_atomic(&path, b"hello\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");

        write_atomic(&path, b"replaced\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "replaced\n");
    }
}
