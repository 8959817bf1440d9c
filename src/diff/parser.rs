//! Unified-diff parsing.
//!
//! Parsing is all-or-nothing: any malformed section aborts the whole parse
//! and no partial [`Patch`] is produced. The parser tolerates the noise that
//! surrounds real-world diffs (`diff --git` lines, `index` lines, timestamps
//! after paths, `\ No newline at end of file` markers, CRLF/LF mixing) while
//! holding the hunk invariants strictly.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::{FileDiff, Hunk, HunkLine, LineKind, NewlineStyle, Patch};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("patch contains no file sections")]
    NoFileSections,

    #[error("file section for {path} has no hunks")]
    EmptyFileSection { path: PathBuf },

    #[error("hunk header at line {line_number} appears before any file header")]
    HunkOutsideFile { line_number: usize },

    #[error("malformed hunk header at line {line_number}: {header}")]
    BadHunkHeader { line_number: usize, header: String },

    #[error("hunk {hunk} of {path} declares {declared} old lines but carries {actual}")]
    OldCountMismatch {
        path: PathBuf,
        hunk: usize,
        declared: usize,
        actual: usize,
    },

    #[error("hunk {hunk} of {path} declares {declared} new lines but carries {actual}")]
    NewCountMismatch {
        path: PathBuf,
        hunk: usize,
        declared: usize,
        actual: usize,
    },

    #[error("hunks {previous} and {hunk} of {path} overlap or are out of order")]
    HunkOrder {
        path: PathBuf,
        previous: usize,
        hunk: usize,
    },
}

/// One raw input line, split from the patch text with its terminator removed.
struct RawLine<'a> {
    content: &'a str,
    /// True when the line was terminated by `\r\n`.
    crlf: bool,
    /// True when the line had any terminator at all.
    terminated: bool,
}

fn split_raw(text: &str) -> Vec<RawLine<'_>> {
    text.split_inclusive('\n')
        .map(|raw| {
            if let Some(stripped) = raw.strip_suffix("\r\n") {
                RawLine {
                    content: stripped,
                    crlf: true,
                    terminated: true,
                }
            } else if let Some(stripped) = raw.strip_suffix('\n') {
                RawLine {
                    content: stripped,
                    crlf: false,
                    terminated: true,
                }
            } else {
                RawLine {
                    content: raw,
                    crlf: false,
                    terminated: false,
                }
            }
        })
        .collect()
}

/// Parse `@@ -old_start[,old_count] +new_start[,new_count] @@ ...`.
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = line.strip_prefix("@@ -")?;
    let end = rest.find(" @@")?;
    let (old_part, new_part) = rest[..end].split_once(" +")?;
    let (old_start, old_count) = parse_range(old_part)?;
    let (new_start, new_count) = parse_range(new_part)?;
    Some((old_start, old_count, new_start, new_count))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Strip a `a/` or `b/` prefix and any trailing tab-separated timestamp from
/// a `---`/`+++` header path.
fn header_path(raw: &str) -> &str {
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    raw.strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw)
}

/// In-progress file section while scanning.
struct Section {
    path: PathBuf,
    hunks: Vec<Hunk>,
    lf: usize,
    crlf: usize,
}

impl Section {
    fn finish(self) -> Result<FileDiff, ParseError> {
        if self.hunks.is_empty() {
            return Err(ParseError::EmptyFileSection { path: self.path });
        }
        for (i, pair) in self.hunks.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            let prev_end = prev.old_start + prev.old_count;
            if next.old_start <= prev.old_start || (prev.old_count > 0 && next.old_start < prev_end)
            {
                return Err(ParseError::HunkOrder {
                    path: self.path,
                    previous: i,
                    hunk: i + 1,
                });
            }
        }
        let newline = if self.crlf > self.lf {
            NewlineStyle::Crlf
        } else {
            NewlineStyle::Lf
        };
        Ok(FileDiff {
            path: self.path,
            hunks: self.hunks,
            newline,
        })
    }
}

/// Parse raw unified-diff text into a [`Patch`].
///
/// Accepts multiple file sections and multiple hunks per section. Fails with
/// [`ParseError`] when a hunk's declared counts disagree with its body, when
/// a file section carries no hunks, or when the input has no sections at all.
pub fn parse(text: &str) -> Result<Patch, ParseError> {
    let raw = split_raw(text);
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<Section> = None;
    // Set while inside a deletion-only section (`+++ /dev/null`), whose hunks
    // are skipped rather than rejected.
    let mut skipping = false;

    let mut i = 0;
    while i < raw.len() {
        let line = raw[i].content;

        if line.starts_with("--- ") {
            // Seek the paired `+++` header; anything between is noise.
            i += 1;
            while i < raw.len() && !raw[i].content.starts_with("+++ ") {
                i += 1;
            }
            if i >= raw.len() {
                break;
            }
            let path = header_path(&raw[i].content[4..]);
            if path == "/dev/null" {
                skipping = true;
            } else {
                skipping = false;
                if let Some(section) = current.take() {
                    files.push(section.finish()?);
                }
                current = Some(Section {
                    path: PathBuf::from(path),
                    hunks: Vec::new(),
                    lf: 0,
                    crlf: 0,
                });
            }
            i += 1;
            continue;
        }

        if line.starts_with("@@") {
            let header = parse_hunk_header(line).ok_or_else(|| ParseError::BadHunkHeader {
                line_number: i + 1,
                header: line.to_string(),
            })?;
            if !skipping && current.is_none() {
                return Err(ParseError::HunkOutsideFile { line_number: i + 1 });
            }
            let (old_start, old_count, new_start, new_count) = header;
            let mut lines: Vec<HunkLine> = Vec::new();
            let mut lf = 0usize;
            let mut crlf = 0usize;
            i += 1;
            while i < raw.len() {
                let body = raw[i].content;
                if body.starts_with("--- ") || body.starts_with("+++ ") || body.starts_with("@@") {
                    break;
                }
                if body.starts_with('\\') {
                    // `\ No newline at end of file`: trailing-newline presence
                    // is preserved from the target file at apply time.
                    i += 1;
                    continue;
                }
                let (kind, text) = match body.chars().next() {
                    Some(' ') => (LineKind::Context, &body[1..]),
                    Some('+') => (LineKind::Add, &body[1..]),
                    Some('-') => (LineKind::Delete, &body[1..]),
                    // Bare line inside a hunk body: treat as context.
                    _ => (LineKind::Context, body),
                };
                if raw[i].terminated {
                    if raw[i].crlf {
                        crlf += 1;
                    } else {
                        lf += 1;
                    }
                }
                lines.push(HunkLine::new(kind, text));
                i += 1;
            }

            if skipping {
                continue;
            }
            let section = current.as_mut().expect("checked above");
            let hunk_index = section.hunks.len();
            let actual_old = lines
                .iter()
                .filter(|l| matches!(l.kind, LineKind::Context | LineKind::Delete))
                .count();
            let actual_new = lines
                .iter()
                .filter(|l| matches!(l.kind, LineKind::Context | LineKind::Add))
                .count();
            if actual_old != old_count {
                return Err(ParseError::OldCountMismatch {
                    path: section.path.clone(),
                    hunk: hunk_index,
                    declared: old_count,
                    actual: actual_old,
                });
            }
            if actual_new != new_count {
                return Err(ParseError::NewCountMismatch {
                    path: section.path.clone(),
                    hunk: hunk_index,
                    declared: new_count,
                    actual: actual_new,
                });
            }
            section.lf += lf;
            section.crlf += crlf;
            section.hunks.push(Hunk {
                old_start,
                old_count,
                new_start,
                new_count,
                lines,
            });
            continue;
        }

        i += 1;
    }

    if let Some(section) = current.take() {
        files.push(section.finish()?);
    }
    if files.is_empty() {
        return Err(ParseError::NoFileSections);
    }
    Ok(Patch { files })
}

/// Parse a diff known to target a single `path`.
///
/// Model and tool output often hands back a bare hunk body without
/// `---`/`+++` headers; synthesize them in that case. When headers are
/// present the section matching `path` wins, falling back to the first.
pub fn parse_single(path: &Path, diff_text: &str) -> Result<FileDiff, ParseError> {
    if diff_text.starts_with("--- ") || diff_text.contains("\n--- ") {
        let patch = parse(diff_text)?;
        let mut files = patch.files;
        if let Some(pos) = files.iter().position(|f| f.path == path) {
            return Ok(files.swap_remove(pos));
        }
        return Ok(files.swap_remove(0));
    }
    let synthesized = format!(
        "--- a/{}\n+++ b/{}\n{}",
        path.display(),
        path.display(),
        diff_text
    );
    let patch = parse(&synthesized)?;
    let mut files = patch.files;
    Ok(files.swap_remove(0))
}
