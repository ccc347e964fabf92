//! Version control for the site repository.
//!
//! - **Backend**: [`VersionControl`] trait + [`VcsError`]
//! - **Git**: [`GitRepository`], the git2-backed implementation, plus the
//!   clone/pull/author plumbing the CLI uses to keep a working tree around

pub mod backend;
pub mod git;

pub use backend::{VcsError, VersionControl};
pub use git::{Author, GitRepository, SyncOutcome};
