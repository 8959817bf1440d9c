//! Driftpatch: drift-tolerant unified-diff patching with a DAG workflow core
//!
//! A patching system for working trees that keeps applying when the world
//! has moved: already-applied hunks are recognized and skipped, shifted
//! hunks are re-located within a bounded offset window, and whitespace-only
//! drift can be forgiven. A small DAG workflow engine sequences the stages
//! that produce and consume those patches.
//!
//! # Architecture
//!
//! The apply pipeline is parse → match → splice → commit. All intelligence
//! lives in the match phase ([`apply::matcher`]); application itself is a
//! plain line splice followed by an atomic file replacement. The workflow
//! side keeps graphs as pure data (stage and condition *names*), with
//! executable bindings resolved through a [`graph::Registry`], which is what
//! makes graphs exportable and importable losslessly.
//!
//! # Safety
//!
//! - Dry-run computes the exact outcome of a real pass without touching disk
//! - Every mutated file is snapshotted before its first write
//! - Atomic file writes (tempfile + fsync + rename)
//! - Tree boundary enforcement for patch target paths
//! - Executor steps are atomic: a failed stage never leaks a partial Context
//!
//! # Example
//!
//! ```no_run
//! use driftpatch::{apply, parse, ApplyConfig, ApplyMode};
//! use std::path::Path;
//!
//! let patch = parse(
//!     "--- a/src/main.rs\n+++ b/src/main.rs\n@@ -1,1 +1,1 @@\n-old\n+new\n",
//! )?;
//!
//! // Dry-run first; the summary is exactly what a real pass would do.
//! let preview = apply(&patch, Path::new("."), ApplyMode::DryRun, &ApplyConfig::default())?;
//! if preview.is_clean() {
//!     apply(&patch, Path::new("."), ApplyMode::Real, &ApplyConfig::default())?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod apply;
pub mod diff;
pub mod graph;
pub mod safety;

// Re-exports
pub use apply::{
    apply, ApplyConfig, ApplyError, ApplyMode, ApplyResult, ApplySummary, BackupManager,
    BackupRecord, Confidence, FileReport, HunkReport, MatchConfig, OutcomeCounts, RejectReason,
};
pub use diff::{
    parse, parse_single, FileDiff, Hunk, HunkLine, LineKind, NewlineStyle, ParseError, Patch,
};
pub use graph::{
    detect_cycle, Context, Edge, GraphError, GraphExecutor, GraphManager, GraphRecord, Node,
    Registry, StepOutcome, WorkflowGraph,
};
pub use safety::{SafetyError, TreeGuard};
