//! Hunk location: exact, already-applied, or fuzzy within an offset window.
//!
//! The ordering here is the correctness contract for the whole apply
//! pipeline: exact beats already-applied beats fuzzy, and the fuzzy offset
//! search is fully deterministic for identical inputs.

use crate::diff::Hunk;

/// Knobs for hunk location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Maximum absolute line offset searched during the fuzzy phase.
    pub fuzz_window: usize,
    /// Ignore leading/trailing whitespace per line during the fuzzy phase
    /// (and only there).
    pub relax_whitespace: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzz_window: 5,
            relax_whitespace: false,
        }
    }
}

/// How confident a fuzzy hit is in the matched content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Lines matched byte-for-byte, only the position drifted.
    Exact,
    /// Lines matched after per-line whitespace trimming.
    WhitespaceRelaxed,
}

/// Outcome of locating one hunk in the current file content.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a located hunk still has to be spliced or reported"]
pub enum HunkMatch {
    /// Old lines found at the expected position. `at` is a 0-based index.
    Exact { at: usize },
    /// New lines found at the expected post-apply position; nothing to do.
    AlreadyApplied,
    /// Old lines found at `offset` lines away from the expected position.
    Fuzzy {
        at: usize,
        offset: isize,
        confidence: Confidence,
    },
    /// No position within the window matched. `similarity` is the best
    /// candidate ratio seen, as a diagnostic for reporting.
    NoMatch { similarity: f64 },
}

/// Locate `hunk` within `lines`.
///
/// * `pre_pos` — 0-based position where the hunk's old lines are expected,
///   already adjusted by the caller's running offset.
/// * `post_pos` — 0-based position where the hunk's new lines would sit if
///   the hunk were already applied.
/// * `bias` — distance from `pre_pos` back to the hunk's raw recorded
///   position; breaks fuzzy-offset ties toward the recorded location.
pub fn locate(
    hunk: &Hunk,
    lines: &[String],
    pre_pos: isize,
    post_pos: isize,
    bias: isize,
    config: &MatchConfig,
) -> HunkMatch {
    let old: Vec<&str> = hunk.old_lines().collect();
    let new: Vec<&str> = hunk.new_lines().collect();

    // A pure insertion has no pre-image to anchor on: recognize an
    // already-present insertion before re-inserting it.
    if old.is_empty() && !new.is_empty() && slice_matches(lines, post_pos, &new, false) {
        return HunkMatch::AlreadyApplied;
    }

    // 1. Exact match at the expected position.
    if slice_matches(lines, pre_pos, &old, false) {
        return HunkMatch::Exact {
            at: pre_pos as usize,
        };
    }

    // 2. Already applied: the post-apply content is present where it would
    // land. No mutation needed, no offset contributed.
    if !new.is_empty() && slice_matches(lines, post_pos, &new, false) {
        return HunkMatch::AlreadyApplied;
    }

    // 3. Fuzzy search over the offset window, nearest offsets first. A
    // strict hit at an offset outranks a relaxed hit at the same offset.
    for offset in candidate_offsets(config.fuzz_window, bias) {
        let pos = pre_pos + offset;
        if offset != 0 && slice_matches(lines, pos, &old, false) {
            return HunkMatch::Fuzzy {
                at: pos as usize,
                offset,
                confidence: Confidence::Exact,
            };
        }
        if config.relax_whitespace && slice_matches(lines, pos, &old, true) {
            return HunkMatch::Fuzzy {
                at: pos as usize,
                offset,
                confidence: Confidence::WhitespaceRelaxed,
            };
        }
    }

    HunkMatch::NoMatch {
        similarity: best_similarity(lines, pre_pos, &old, config.fuzz_window),
    }
}

/// Compare `needle` against `lines` starting at `pos`. Out-of-bounds
/// positions never match; an empty needle matches at any in-bounds position
/// (a pure insertion point).
fn slice_matches(lines: &[String], pos: isize, needle: &[&str], relax: bool) -> bool {
    if pos < 0 {
        return false;
    }
    let pos = pos as usize;
    if pos > lines.len() || lines.len() - pos < needle.len() {
        return false;
    }
    needle.iter().zip(&lines[pos..]).all(|(want, have)| {
        if relax {
            want.trim() == have.trim()
        } else {
            *want == have.as_str()
        }
    })
}

/// Offsets `-window..=window` ordered nearest-first; ties at equal magnitude
/// break toward `bias` (the raw recorded position), then negative before
/// positive.
fn candidate_offsets(window: usize, bias: isize) -> Vec<isize> {
    let window = window as isize;
    let mut offsets: Vec<isize> = (-window..=window).collect();
    offsets.sort_by_key(|&d| {
        let toward_bias = bias != 0 && d != 0 && d.signum() == bias.signum();
        let tie = if toward_bias {
            0
        } else if d < 0 {
            1
        } else {
            2
        };
        (d.abs(), tie)
    });
    offsets
}

/// Best similarity ratio between the hunk's old lines and any candidate
/// window position. Diagnostic only; never drives an apply decision.
fn best_similarity(lines: &[String], pre_pos: isize, old: &[&str], window: usize) -> f64 {
    if old.is_empty() {
        return 0.0;
    }
    let wanted = old.join("\n");
    let mut best = 0.0f64;
    for offset in -(window as isize)..=(window as isize) {
        let pos = pre_pos + offset;
        if pos < 0 {
            continue;
        }
        let pos = pos as usize;
        if pos >= lines.len() {
            continue;
        }
        let end = (pos + old.len()).min(lines.len());
        let candidate = lines[pos..end].join("\n");
        let ratio = strsim::normalized_levenshtein(&wanted, &candidate);
        if ratio > best {
            best = ratio;
        }
    }
    best
}
