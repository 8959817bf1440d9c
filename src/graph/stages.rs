//! Stage glue between the graph side and the patch pipeline.
//!
//! A "patch" node's stage takes the turn's pending patches out of the
//! Context, pushes them through parse → match → apply, and writes the
//! summary back for downstream nodes to inspect. Patches arrive in either of
//! the turn shapes: a single unified-diff string, or a list of
//! `{path, unified_diff}` records.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::apply::{apply, ApplyConfig, ApplyMode};
use crate::diff::{parse, parse_single, Patch};

use super::context::Context;
use super::errors::StageError;

/// Build a stage function that applies the Context's `patches` entry to the
/// tree rooted at `tree_root` and records the outcome under `patch_summary`.
///
/// Pair a dry-run instance with a real-mode instance on separate nodes to
/// get the dry-run-before-confirm flow.
pub fn patch_apply_stage(
    tree_root: impl Into<PathBuf>,
    mode: ApplyMode,
    config: ApplyConfig,
) -> impl Fn(Context) -> Result<Context, StageError> + Send + Sync + 'static {
    let root = tree_root.into();
    move |mut ctx: Context| {
        let patch = patch_from_context(&ctx)?;
        let summary = apply(&patch, &root, mode, &config)?;
        let counts = summary.counts();
        ctx.set(
            "patch_summary",
            json!({
                "applied": counts.applied,
                "already_applied": counts.already_applied,
                "fuzzy_applied": counts.fuzzy_applied,
                "rejected": counts.rejected,
                "clean": summary.is_clean(),
            }),
        );
        Ok(ctx)
    }
}

fn patch_from_context(ctx: &Context) -> Result<Patch, StageError> {
    match ctx.get("patches") {
        Some(Value::String(text)) => Ok(parse(text)?),
        Some(Value::Array(records)) => {
            let mut files = Vec::with_capacity(records.len());
            for record in records {
                let path = record
                    .get("path")
                    .and_then(Value::as_str)
                    .ok_or("patch record is missing `path`")?;
                let diff = record
                    .get("unified_diff")
                    .and_then(Value::as_str)
                    .ok_or("patch record is missing `unified_diff`")?;
                files.push(parse_single(Path::new(path), diff)?);
            }
            Ok(Patch { files })
        }
        Some(_) => Err("`patches` must be a diff string or a list of records".into()),
        None => Err("context has no `patches` entry".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn applies_record_shaped_patches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "one\ntwo\n").unwrap();

        let stage = patch_apply_stage(dir.path(), ApplyMode::Real, ApplyConfig::default());
        let mut ctx = Context::new();
        ctx.set(
            "patches",
            json!([{
                "path": "a.txt",
                "unified_diff": "@@ -1,2 +1,2 @@\n-one\n+ONE\n two\n",
            }]),
        );

        let ctx = stage(ctx).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "ONE\ntwo\n"
        );
        let summary = ctx.get("patch_summary").unwrap();
        assert_eq!(summary["applied"], json!(1));
        assert_eq!(summary["clean"], json!(true));
    }

    #[test]
    fn applies_string_shaped_patches_in_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "one\ntwo\n").unwrap();

        let stage = patch_apply_stage(dir.path(), ApplyMode::DryRun, ApplyConfig::default());
        let mut ctx = Context::new();
        ctx.set(
            "patches",
            "--- a/a.txt\n+++ b/a.txt\n@@ -1,2 +1,2 @@\n-one\n+ONE\n two\n",
        );

        let ctx = stage(ctx).unwrap();
        assert_eq!(ctx.get("patch_summary").unwrap()["applied"], json!(1));
        // Dry run: the tree is untouched.
        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "one\ntwo\n"
        );
    }

    #[test]
    fn missing_patches_entry_fails_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let stage = patch_apply_stage(dir.path(), ApplyMode::DryRun, ApplyConfig::default());
        let err = stage(Context::new()).unwrap_err();
        assert!(err.to_string().contains("no `patches` entry"));
    }

    #[test]
    fn malformed_diffs_fail_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let stage = patch_apply_stage(dir.path(), ApplyMode::DryRun, ApplyConfig::default());
        let mut ctx = Context::new();
        ctx.set(
            "patches",
            json!([{"path": "a.txt", "unified_diff": "@@ -1,9 +1,1 @@\n-x\n+y\n"}]),
        );
        assert!(stage(ctx).is_err());
    }
}
