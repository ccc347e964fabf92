//! Version-control capability consumed by the lifecycle service.
//!
//! The service only ever needs three things from the repository: put a path in
//! the staging area, take one out, and turn whatever is staged into a published
//! commit. [`VersionControl`] is that surface; the production implementation is
//! [`GitRepository`](super::git::GitRepository).
//!
//! The staging area is shared mutable state. Implementations do no locking;
//! callers run one mutating operation per working tree at a time.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no changes to commit")]
    NothingToCommit,
    #[error("file does not exist: {0}")]
    MissingFile(PathBuf),
    #[error("path is outside the working tree: {0}")]
    OutsideWorkTree(PathBuf),
    #[error("repository error: {0}")]
    Repository(String),
}

pub trait VersionControl {
    /// Stage a file. Paths are repository-relative or absolute inside the
    /// working tree.
    fn stage(&self, path: &Path) -> Result<(), VcsError>;

    /// Stage the removal of a file.
    fn remove(&self, path: &Path) -> Result<(), VcsError>;

    /// Commit the staged changes and push them.
    ///
    /// Fails with [`VcsError::NothingToCommit`] when nothing is staged.
    fn commit_and_publish(&self, message: &str) -> Result<(), VcsError>;
}

impl<T: VersionControl + ?Sized> VersionControl for &T {
    fn stage(&self, path: &Path) -> Result<(), VcsError> {
        (**self).stage(path)
    }

    fn remove(&self, path: &Path) -> Result<(), VcsError> {
        (**self).remove(path)
    }

    fn commit_and_publish(&self, message: &str) -> Result<(), VcsError> {
        (**self).commit_and_publish(message)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records operations instead of touching a repository.
    ///
    /// `commit_and_publish` behaves like git: it fails with `NothingToCommit`
    /// unless something was staged or removed since the last commit.
    #[derive(Default)]
    pub struct MockVcs {
        pub operations: Mutex<Vec<RecordedOp>>,
        /// Paths whose staging should fail.
        pub fail_stage: Mutex<Vec<PathBuf>>,
        /// Fail every removal.
        pub fail_remove: bool,
        pending: Mutex<usize>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Stage(String),
        Remove(String),
        Commit(String),
    }

    impl MockVcs {
        pub fn failing_removals() -> Self {
            Self {
                fail_remove: true,
                ..Self::default()
            }
        }

        pub fn fail_staging_of(&self, path: impl Into<PathBuf>) {
            self.fail_stage.lock().unwrap().push(path.into());
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn staged(&self) -> Vec<String> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Stage(p) => Some(p),
                    _ => None,
                })
                .collect()
        }

        pub fn removed(&self) -> Vec<String> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Remove(p) => Some(p),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }
    }

    impl VersionControl for MockVcs {
        fn stage(&self, path: &Path) -> Result<(), VcsError> {
            if self.fail_stage.lock().unwrap().iter().any(|p| p == path) {
                return Err(VcsError::MissingFile(path.to_path_buf()));
            }
            self.record(RecordedOp::Stage(path.to_string_lossy().to_string()));
            *self.pending.lock().unwrap() += 1;
            Ok(())
        }

        fn remove(&self, path: &Path) -> Result<(), VcsError> {
            if self.fail_remove {
                return Err(VcsError::Repository(format!(
                    "pathspec '{}' did not match any files",
                    path.display()
                )));
            }
            self.record(RecordedOp::Remove(path.to_string_lossy().to_string()));
            *self.pending.lock().unwrap() += 1;
            Ok(())
        }

        fn commit_and_publish(&self, message: &str) -> Result<(), VcsError> {
            let mut pending = self.pending.lock().unwrap();
            if *pending == 0 {
                return Err(VcsError::NothingToCommit);
            }
            *pending = 0;
            self.record(RecordedOp::Commit(message.to_string()));
            Ok(())
        }
    }

    #[test]
    fn mock_commit_requires_staged_changes() {
        let vcs = MockVcs::default();
        assert!(matches!(
            vcs.commit_and_publish("empty"),
            Err(VcsError::NothingToCommit)
        ));

        vcs.stage(Path::new("content/posts/1.md")).unwrap();
        vcs.commit_and_publish("one").unwrap();
        assert_eq!(
            vcs.get_operations(),
            vec![
                RecordedOp::Stage("content/posts/1.md".into()),
                RecordedOp::Commit("one".into()),
            ]
        );
    }

    #[test]
    fn references_forward_to_the_implementation() {
        let vcs = MockVcs::default();
        let by_ref: &MockVcs = &vcs;
        VersionControl::stage(&by_ref, Path::new("a.md")).unwrap();
        assert_eq!(vcs.staged(), vec!["a.md"]);
    }

    #[test]
    fn nothing_to_commit_message() {
        assert_eq!(VcsError::NothingToCommit.to_string(), "no changes to commit");
    }
}
