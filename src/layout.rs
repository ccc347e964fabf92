//! Where posts live on disk.
//!
//! Every post is a *unit* under the posts directory, in one of two shapes:
//!
//! ```text
//! content/posts/
//! ├── 4211.md                  # loose file: post without media
//! └── 4215/                    # directory: post with media
//!     ├── index.md
//!     ├── image_0.jpg
//!     └── image_1.png
//! ```
//!
//! Media presence is the only thing that decides the shape. The file names
//! carry the source message id, which is how edits find their way back: a
//! message edit may arrive under a slightly different id than the one the
//! post was created from (media groups are several consecutive messages), so
//! [`PostLayout::resolve_edit_target`] snaps to the closest unit on disk.
//!
//! [`PostLayout`] keeps both the absolute posts directory (for file I/O) and
//! the same directory relative to the repository root (for staging).

use crate::media::MEDIA_PREFIX;
use crate::post::PostId;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INDEX_FILE: &str = "index.md";

/// Physical shape of a post unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitShape {
    /// `<id>.md`
    Loose,
    /// `<id>/` with `index.md` and media
    Directory,
    Absent,
}

#[derive(Debug, Clone)]
pub struct PostLayout {
    root: PathBuf,
    rel_root: PathBuf,
}

impl PostLayout {
    /// `root` is the posts directory on disk, `rel_root` the same directory
    /// relative to the repository working tree.
    pub fn new(root: impl Into<PathBuf>, rel_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rel_root: rel_root.into(),
        }
    }

    /// Layout for `posts_dir` (relative) inside the working tree `repo_dir`.
    pub fn in_repository(repo_dir: &Path, posts_dir: &Path) -> Self {
        Self::new(repo_dir.join(posts_dir), posts_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn loose_file(&self, id: PostId) -> PathBuf {
        self.root.join(loose_name(id))
    }

    pub fn unit_dir(&self, id: PostId) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn index_file(&self, id: PostId) -> PathBuf {
        self.unit_dir(id).join(INDEX_FILE)
    }

    pub fn media_file(&self, id: PostId, name: &str) -> PathBuf {
        self.unit_dir(id).join(name)
    }

    pub fn rel_loose_file(&self, id: PostId) -> PathBuf {
        self.rel_root.join(loose_name(id))
    }

    pub fn rel_index_file(&self, id: PostId) -> PathBuf {
        self.rel_root.join(id.to_string()).join(INDEX_FILE)
    }

    pub fn rel_media_file(&self, id: PostId, name: &str) -> PathBuf {
        self.rel_root.join(id.to_string()).join(name)
    }

    /// Markup file of a unit, absolute and repository-relative.
    pub fn markup_paths(&self, id: PostId, with_media: bool) -> (PathBuf, PathBuf) {
        if with_media {
            (self.index_file(id), self.rel_index_file(id))
        } else {
            (self.loose_file(id), self.rel_loose_file(id))
        }
    }

    pub fn shape(&self, id: PostId) -> UnitShape {
        if self.unit_dir(id).is_dir() {
            UnitShape::Directory
        } else if self.loose_file(id).is_file() {
            UnitShape::Loose
        } else {
            UnitShape::Absent
        }
    }

    /// Media files of a unit, sorted by name.
    ///
    /// The sort is lexicographic, so `image_10` comes before `image_2`.
    /// A unit without a directory has no media.
    pub fn image_names_for(&self, id: PostId) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(self.unit_dir(id)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().to_string();
            if name.starts_with(MEDIA_PREFIX) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Ids of every unit currently on disk, in directory order.
    pub fn post_ids(&self) -> io::Result<Vec<PostId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(id) = parse_unit_name(&name) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// The unit an edit of message `requested` applies to.
    ///
    /// Picks the id with the smallest distance to `requested`; on a tie the
    /// lower id wins. With no units on disk the requested id is returned
    /// unchanged.
    pub fn resolve_edit_target(&self, requested: PostId) -> io::Result<PostId> {
        let ids = self.post_ids()?;
        let target = nearest_id(&ids, requested).unwrap_or(requested);
        debug!(requested, target, candidates = ids.len(), "resolved edit target");
        Ok(target)
    }
}

fn loose_name(id: PostId) -> String {
    format!("{id}.md")
}

/// `"4211.md"` → 4211, `"4215"` → 4215. Index files and names that are not
/// numeric are not units.
fn parse_unit_name(name: &str) -> Option<PostId> {
    if name.contains("index") {
        return None;
    }
    let stem = match name.split_once('.') {
        Some((stem, _)) => stem,
        None => name,
    };
    stem.parse().ok()
}

fn nearest_id(ids: &[PostId], requested: PostId) -> Option<PostId> {
    ids.iter()
        .copied()
        .min_by_key(|&id| (id.abs_diff(requested), id))
}
