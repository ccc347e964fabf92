//! # postsmith
//!
//! Turns channel messages into posts of a Zola site kept in git. A message is
//! HTML-flavoured text plus optional media; postsmith renders it to markdown
//! with TOML front matter, lays it out under the site's posts directory, and
//! stages the files. Edits and deletions find their way back to the unit a
//! message produced.
//!
//! # Pipeline
//!
//! ```text
//! message + media bytes
//!   → media      sniff each buffer, name it image_<n>.<ext>
//!   → markup     HTML fragments → markdown (ordered rewrite stages)
//!   → title      trailing 0x… address → title, stripped from the body
//!   → front_matter
//!   → layout     <id>.md, or <id>/index.md + media
//!   → vcs        stage; delete also commits and pushes
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`media`] | Magic-number image classification and media file naming |
//! | [`markup`] | Message HTML → site markdown as a table of named stages |
//! | [`title`] | Title derivation from a trailing address, and its removal |
//! | [`front_matter`] | `+++` TOML front matter |
//! | [`post`] | The transient [`Post`] record |
//! | [`layout`] | Post units on disk, media listing, nearest-id edit resolution |
//! | [`lifecycle`] | [`PostService`]: create, edit, delete |
//! | [`vcs`] | [`VersionControl`] capability and the git2-backed [`GitRepository`] |
//! | [`config`] | `postsmith.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | tracing subscriber setup for the binary |
//!
//! # Design Decisions
//!
//! ## One Shape Per Post
//!
//! A post is either a loose `<id>.md` or a `<id>/` directory, never both. Media
//! is what decides: a post created with attachments is a directory, and a loose
//! post that later gains an attachment is moved into `<id>/index.md`.
//!
//! ## Ids Are Message Ids
//!
//! Units are named after the message they came from. A media group arrives as
//! several consecutive messages, so an edit to the third picture of a group
//! carries an id two higher than the post. [`layout::PostLayout::resolve_edit_target`]
//! snaps to the nearest unit (lower id on a tie) and the difference becomes the
//! media slot.
//!
//! ## Injected Version Control
//!
//! The lifecycle service only stages. Committing and pushing go through the
//! same [`VersionControl`] handle, so tests run against a recording mock and
//! production against git. Nothing locks the working tree; run one mutating
//! command at a time.

pub mod config;
pub mod front_matter;
pub mod layout;
pub mod lifecycle;
pub mod logging;
pub mod markup;
pub mod media;
pub mod output;
pub mod post;
pub mod title;
pub mod vcs;

pub use front_matter::build_front_matter;
pub use lifecycle::{Deletion, LifecycleError, PostChange, PostService};
pub use markup::transform;
pub use media::classify_image;
pub use post::{Post, PostId};
pub use title::{extract_title, remove_address_pattern};
pub use vcs::{GitRepository, VcsError, VersionControl};

#[cfg(test)]
pub(crate) mod test_helpers;
