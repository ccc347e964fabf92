//! Create, edit and delete post units.
//!
//! [`PostService`] ties the pure pieces together: it names media with
//! [`crate::media`], renders markup with [`crate::markup`], [`crate::title`]
//! and [`crate::front_matter`], picks paths with [`PostLayout`] and stages the
//! result through an injected [`VersionControl`].
//!
//! ## Operations
//!
//! - **create**: writes `<id>.md`, or `<id>/index.md` plus `image_0..k-1`
//!   when media is attached, and stages every file. Nothing is committed.
//! - **edit**: snaps the message id to the nearest unit on disk, rewrites the
//!   markup when new content is given and drops one media file in at
//!   `image_<requested - resolved>`, negative when the message precedes the
//!   unit it snapped to. A loose post that gains media is moved to
//!   `<id>/index.md` first so each id keeps a single shape. Nothing is
//!   committed.
//! - **delete**: removes a comma-separated batch of units and commits and
//!   publishes the result in one go.
//!
//! The service holds no locks. Callers run one mutating operation per working
//! tree at a time.

use crate::front_matter::build_front_matter;
use crate::layout::{PostLayout, UnitShape};
use crate::markup::transform;
use crate::media::{format_hint, image_file_name, media_file_name};
use crate::post::{Post, PostId};
use crate::title::{extract_title, remove_address_pattern};
use crate::vcs::{VcsError, VersionControl};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to stage {}: {source}", path.display())]
    Stage { path: PathBuf, source: VcsError },
    #[error("failed to unstage {}: {source}", path.display())]
    Unstage { path: PathBuf, source: VcsError },
    #[error("failed to commit and publish: {0}")]
    Publish(#[source] VcsError),
    #[error("invalid post ID: {0}")]
    InvalidPostId(String),
}

/// What a create or edit did to the working tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostChange {
    /// Unit the change was applied to.
    pub id: PostId,
    /// Message id the request arrived with.
    pub requested_id: PostId,
    pub shape: UnitShape,
    /// Title written to the front matter, if the markup was rewritten.
    pub title: Option<String>,
    /// Repository-relative paths staged, in order.
    pub staged: Vec<PathBuf>,
    /// Repository-relative paths removed from the index.
    pub unstaged: Vec<PathBuf>,
}

impl PostChange {
    fn new(id: PostId, requested_id: PostId) -> Self {
        Self {
            id,
            requested_id,
            shape: UnitShape::Absent,
            title: None,
            staged: Vec::new(),
            unstaged: Vec::new(),
        }
    }
}

/// Outcome of a delete batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deletion {
    /// Ids whose unit existed and was removed.
    pub deleted: Vec<PostId>,
    /// Ids with no unit on disk.
    pub missing: Vec<PostId>,
    /// Ids whose media could not be listed; left untouched.
    pub skipped: Vec<PostId>,
    pub message: String,
}

pub struct PostService<V> {
    layout: PostLayout,
    vcs: V,
    channel: String,
}

impl<V: VersionControl> PostService<V> {
    /// `channel` is the title fallback for posts without an explicit title.
    pub fn new(layout: PostLayout, vcs: V, channel: impl Into<String>) -> Self {
        Self {
            layout,
            vcs,
            channel: channel.into(),
        }
    }

    /// Write a new post unit and stage it.
    ///
    /// `media[i]` becomes `image_<i>.<ext>`. Any existing unit with the same
    /// id is replaced, including one of the other shape.
    pub fn create(&self, mut post: Post, media: &[Vec<u8>]) -> Result<PostChange, LifecycleError> {
        post.image_names = media
            .iter()
            .enumerate()
            .map(|(i, data)| media_file_name(i, data))
            .collect();

        let with_media = !post.image_names.is_empty();
        let mut change = PostChange::new(post.id, post.id);
        change.shape = if with_media {
            UnitShape::Directory
        } else {
            UnitShape::Loose
        };

        let dir = if with_media {
            self.layout.unit_dir(post.id)
        } else {
            self.layout.root().to_path_buf()
        };
        create_dir(&dir)?;
        self.clear_other_shape(post.id, with_media, &mut change)?;

        let (path, rel) = self.layout.markup_paths(post.id, with_media);
        let document = self.render(&mut post);
        write_file(&path, document.as_bytes())?;
        self.stage(&rel, &mut change)?;

        for (name, data) in post.image_names.iter().zip(media) {
            write_file(&self.layout.media_file(post.id, name), data)?;
            self.stage(&self.layout.rel_media_file(post.id, name), &mut change)?;
        }

        info!(
            id = post.id,
            media = media.len(),
            title = %post.title,
            "created post"
        );
        change.title = Some(post.title);
        Ok(change)
    }

    /// Amend the unit nearest to `post.id`.
    ///
    /// Empty `post.content` leaves the markup alone. A non-empty
    /// `post.image_names` on entry is a format hint: the front matter then
    /// lists every existing media slot with the hinted extension.
    pub fn edit(&self, mut post: Post, media: Option<&[u8]>) -> Result<PostChange, LifecycleError> {
        let requested = post.id;
        let target = self
            .layout
            .resolve_edit_target(requested)
            .map_err(io_error("read", self.layout.root()))?;
        let offset = requested - target;

        let existing = self
            .layout
            .image_names_for(target)
            .map_err(io_error("list", &self.layout.unit_dir(target)))?;
        post.id = target;
        let mut change = PostChange::new(target, requested);
        debug!(requested, target, offset, media = existing.len(), "editing post");

        if !post.content.is_empty() {
            post.image_names = match post.image_names.first() {
                Some(hint) if !existing.is_empty() => {
                    let ext = format_hint(hint);
                    (0..existing.len())
                        .map(|i| image_file_name(i, ext))
                        .collect()
                }
                _ => existing,
            };

            let as_directory = self.layout.shape(target) == UnitShape::Directory;
            if !as_directory {
                create_dir(self.layout.root())?;
            }
            let (path, rel) = self.layout.markup_paths(target, as_directory);
            let document = self.render(&mut post);
            write_file(&path, document.as_bytes())?;
            self.stage(&rel, &mut change)?;
            info!(id = target, title = %post.title, "rewrote post markup");
            change.title = Some(post.title.clone());
        }

        if let Some(data) = media {
            if self.layout.shape(target) == UnitShape::Loose {
                self.promote(target, &mut change)?;
            }
            create_dir(&self.layout.unit_dir(target))?;

            let name = media_file_name(offset, data);
            write_file(&self.layout.media_file(target, &name), data)?;
            self.stage(&self.layout.rel_media_file(target, &name), &mut change)?;
            info!(id = target, media = %name, "attached media");
        }

        change.shape = self.layout.shape(target);
        Ok(change)
    }

    /// Remove every unit in the comma-separated `ids` and publish.
    ///
    /// Ids without a unit are no-ops. A malformed id aborts the batch
    /// without committing; units removed before it stay removed on disk.
    pub fn delete(&self, ids: &str) -> Result<Deletion, LifecycleError> {
        let mut deletion = Deletion {
            deleted: Vec::new(),
            missing: Vec::new(),
            skipped: Vec::new(),
            message: format!("Delete post(s): {ids}"),
        };

        for raw in ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id: PostId = raw
                .parse()
                .map_err(|_| LifecycleError::InvalidPostId(raw.to_string()))?;

            let images = match self.layout.image_names_for(id) {
                Ok(images) => images,
                Err(e) => {
                    warn!(id, error = %e, "cannot list media, skipping");
                    deletion.skipped.push(id);
                    continue;
                }
            };

            if !images.is_empty() {
                let dir = self.layout.unit_dir(id);
                fs::remove_dir_all(&dir).map_err(io_error("remove", &dir))?;
                self.unstage_quietly(&self.layout.rel_index_file(id));
                for name in &images {
                    self.unstage_quietly(&self.layout.rel_media_file(id, name));
                }
                deletion.deleted.push(id);
            } else {
                let path = self.layout.loose_file(id);
                match fs::remove_file(&path) {
                    Ok(()) => deletion.deleted.push(id),
                    Err(e) => {
                        debug!(id, error = %e, "no loose file to remove");
                        deletion.missing.push(id);
                    }
                }
                self.unstage_quietly(&self.layout.rel_loose_file(id));
            }
        }

        self.publish(&deletion.message)?;
        info!(
            deleted = ?deletion.deleted,
            missing = ?deletion.missing,
            "deleted posts"
        );
        Ok(deletion)
    }

    /// Commit whatever is staged and push it.
    pub fn publish(&self, message: &str) -> Result<(), LifecycleError> {
        self.vcs
            .commit_and_publish(message)
            .map_err(LifecycleError::Publish)
    }

    /// Front matter + transformed body. Fills in the title when empty.
    ///
    /// Trailing newlines are dropped so a final address line still leaves the
    /// body.
    fn render(&self, post: &mut Post) -> String {
        let content = post.content.trim_end_matches(['\r', '\n']);
        let body = transform(content);
        if post.title.is_empty() {
            post.title = extract_title(content, &self.channel);
        }
        let body = remove_address_pattern(&body);
        format!("{}{}\n", build_front_matter(post), body)
    }

    /// Remove the unit of the shape not being written, so an id never has both
    /// `<id>.md` and `<id>/`.
    fn clear_other_shape(
        &self,
        id: PostId,
        as_directory: bool,
        change: &mut PostChange,
    ) -> Result<(), LifecycleError> {
        if as_directory {
            let path = self.layout.loose_file(id);
            if !path.is_file() {
                return Ok(());
            }
            fs::remove_file(&path).map_err(io_error("remove", &path))?;
            self.unstage(&self.layout.rel_loose_file(id), change)?;
        } else {
            let dir = self.layout.unit_dir(id);
            if !dir.is_dir() {
                return Ok(());
            }
            let images = self
                .layout
                .image_names_for(id)
                .map_err(io_error("list", &dir))?;
            let had_index = self.layout.index_file(id).is_file();
            fs::remove_dir_all(&dir).map_err(io_error("remove", &dir))?;
            if had_index {
                self.unstage(&self.layout.rel_index_file(id), change)?;
            }
            for name in &images {
                self.unstage(&self.layout.rel_media_file(id, name), change)?;
            }
        }
        debug!(id, as_directory, "replaced unit of the other shape");
        Ok(())
    }

    /// Move `<id>.md` to `<id>/index.md` and record the move in the index.
    fn promote(&self, id: PostId, change: &mut PostChange) -> Result<(), LifecycleError> {
        let from = self.layout.loose_file(id);
        let to = self.layout.index_file(id);
        create_dir(&self.layout.unit_dir(id))?;
        fs::rename(&from, &to).map_err(io_error("move", &from))?;

        self.stage(&self.layout.rel_index_file(id), change)?;
        self.unstage(&self.layout.rel_loose_file(id), change)?;
        info!(id, "moved loose post into a directory");
        Ok(())
    }

    fn stage(&self, rel: &Path, change: &mut PostChange) -> Result<(), LifecycleError> {
        self.vcs
            .stage(rel)
            .map_err(|source| LifecycleError::Stage {
                path: rel.to_path_buf(),
                source,
            })?;
        change.staged.push(rel.to_path_buf());
        Ok(())
    }

    fn unstage(&self, rel: &Path, change: &mut PostChange) -> Result<(), LifecycleError> {
        self.vcs
            .remove(rel)
            .map_err(|source| LifecycleError::Unstage {
                path: rel.to_path_buf(),
                source,
            })?;
        change.unstaged.push(rel.to_path_buf());
        Ok(())
    }

    fn unstage_quietly(&self, rel: &Path) {
        if let Err(e) = self.vcs.remove(rel) {
            warn!(path = %rel.display(), error = %e, "ignoring failed removal");
        }
    }
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> LifecycleError {
    let path = path.to_path_buf();
    move |source| LifecycleError::Io {
        action,
        path,
        source,
    }
}

fn create_dir(dir: &Path) -> Result<(), LifecycleError> {
    fs::create_dir_all(dir).map_err(io_error("create", dir))
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), LifecycleError> {
    fs::write(path, data).map_err(io_error("write", path))
}
