use std::path::PathBuf;

/// Tag for one line inside a hunk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Add,
    Delete,
}

/// One tagged line of a hunk. Text is stored without its line terminator;
/// newline style is tracked per file, not per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: LineKind,
    pub text: String,
}

impl HunkLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A contiguous block of changes against one file.
///
/// Invariants (enforced by the parser): the number of context+delete lines
/// equals `old_count`, and the number of context+add lines equals `new_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based start line in the pre-patch file (0 for an empty old side).
    pub old_start: usize,
    pub old_count: usize,
    /// 1-based start line in the post-patch file (0 for an empty new side).
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// The lines this hunk expects to find in the file (context + delete).
    pub fn old_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(|l| matches!(l.kind, LineKind::Context | LineKind::Delete))
            .map(|l| l.text.as_str())
    }

    /// The lines this hunk leaves behind after applying (context + add).
    pub fn new_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(|l| matches!(l.kind, LineKind::Context | LineKind::Add))
            .map(|l| l.text.as_str())
    }

    /// Net line-count change this hunk introduces when applied.
    pub fn net_delta(&self) -> isize {
        self.new_count as isize - self.old_count as isize
    }
}

/// Dominant newline style of a file section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewlineStyle {
    #[default]
    Lf,
    Crlf,
}

impl NewlineStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            NewlineStyle::Lf => "\n",
            NewlineStyle::Crlf => "\r\n",
        }
    }

    /// Detect the dominant style of `text`. Ties and newline-free text
    /// resolve to LF.
    pub fn detect(text: &str) -> Self {
        let crlf = text.matches("\r\n").count();
        let lf = text.matches('\n').count() - crlf;
        if crlf > lf {
            NewlineStyle::Crlf
        } else {
            NewlineStyle::Lf
        }
    }
}

/// All hunks targeting a single file, ordered by `old_start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Target path, relative to the tree root the patch is applied against.
    pub path: PathBuf,
    pub hunks: Vec<Hunk>,
    /// Dominant newline style of the patch's file section. Used when the
    /// target file does not exist yet; existing files keep their own style.
    pub newline: NewlineStyle,
}

/// A parsed patch: an ordered set of per-file diffs. Immutable after parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub files: Vec<FileDiff>,
}

impl Patch {
    pub fn hunk_count(&self) -> usize {
        self.files.iter().map(|f| f.hunks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunk_with(lines: Vec<(LineKind, &str)>) -> Hunk {
        let lines: Vec<HunkLine> = lines
            .into_iter()
            .map(|(k, t)| HunkLine::new(k, t))
            .collect();
        let old = lines
            .iter()
            .filter(|l| matches!(l.kind, LineKind::Context | LineKind::Delete))
            .count();
        let new = lines
            .iter()
            .filter(|l| matches!(l.kind, LineKind::Context | LineKind::Add))
            .count();
        Hunk {
            old_start: 1,
            old_count: old,
            new_start: 1,
            new_count: new,
            lines,
        }
    }

    #[test]
    fn old_and_new_line_views() {
        let hunk = hunk_with(vec![
            (LineKind::Context, "a"),
            (LineKind::Delete, "b"),
            (LineKind::Add, "B"),
            (LineKind::Context, "c"),
        ]);
        let old: Vec<&str> = hunk.old_lines().collect();
        let new: Vec<&str> = hunk.new_lines().collect();
        assert_eq!(old, vec!["a", "b", "c"]);
        assert_eq!(new, vec!["a", "B", "c"]);
        assert_eq!(hunk.net_delta(), 0);
    }

    #[test]
    fn net_delta_tracks_growth() {
        let hunk = hunk_with(vec![
            (LineKind::Context, "a"),
            (LineKind::Add, "x"),
            (LineKind::Add, "y"),
        ]);
        assert_eq!(hunk.net_delta(), 2);
    }

    #[test]
    fn newline_detection_prefers_majority() {
        assert_eq!(NewlineStyle::detect("a\nb\nc\n"), NewlineStyle::Lf);
        assert_eq!(NewlineStyle::detect("a\r\nb\r\nc\n"), NewlineStyle::Crlf);
        assert_eq!(NewlineStyle::detect("a\r\nb\n"), NewlineStyle::Lf);
        assert_eq!(NewlineStyle::detect(""), NewlineStyle::Lf);
    }
}
