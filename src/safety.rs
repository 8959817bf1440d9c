use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Tree safety checks to keep patch targets inside the tree being patched.
///
/// Resolution is lexical rather than canonicalizing: a patch may legitimately
/// create files that do not exist yet, so there is nothing on disk to
/// canonicalize. Escapes via `..` components and absolute target paths are
/// rejected outright.
#[derive(Debug, Clone)]
pub struct TreeGuard {
    /// Root of the tree patches are applied against.
    root: PathBuf,
    /// Relative prefixes no patch is allowed to touch.
    protected: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("patch target is absolute: {path}")]
    AbsoluteTarget { path: PathBuf },

    #[error("patch target escapes the tree: {path}")]
    EscapesTree { path: PathBuf },

    #[error("patch target is under a protected directory: {path} (protected: {protected})")]
    ProtectedPath { path: PathBuf, protected: PathBuf },
}

impl TreeGuard {
    /// Create a guard for the given tree root. Version-control metadata is
    /// protected from the start.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            protected: vec![PathBuf::from(".git")],
        }
    }

    /// Protect an additional tree-relative prefix (the backup store, for one).
    pub fn protect(&mut self, prefix: impl Into<PathBuf>) {
        self.protected.push(prefix.into());
    }

    /// Validate a tree-relative target path and resolve it to an absolute one.
    ///
    /// The target need not exist.
    pub fn resolve(&self, target: &Path) -> Result<PathBuf, SafetyError> {
        if target.is_absolute() {
            return Err(SafetyError::AbsoluteTarget {
                path: target.to_path_buf(),
            });
        }

        let mut normalized = PathBuf::new();
        for component in target.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(SafetyError::EscapesTree {
                            path: target.to_path_buf(),
                        });
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(SafetyError::AbsoluteTarget {
                        path: target.to_path_buf(),
                    });
                }
            }
        }

        for prefix in &self.protected {
            if normalized.starts_with(prefix) {
                return Err(SafetyError::ProtectedPath {
                    path: target.to_path_buf(),
                    protected: prefix.clone(),
                });
            }
        }

        Ok(self.root.join(normalized))
    }

    /// Get the tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
