//! Shared test utilities for the postsmith test suite.
//!
//! Provides magic-number fixtures for the image classifier, a date parser, and
//! [`PostsDir`], a throwaway posts directory laid out the way a Zola site keeps
//! it (`<tmp>/content/posts`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let posts = PostsDir::new();
//! posts.write_loose(100, "hello");
//! posts.write_unit(105, "gallery", &[("image_0.jpg", JPEG_BYTES)]);
//!
//! assert_eq!(posts.layout().resolve_edit_target(103).unwrap(), 105);
//! assert_eq!(posts.read_loose(100), "hello");
//! ```

use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use tempfile::TempDir;

use crate::layout::PostLayout;
use crate::post::PostId;

// =========================================================================
// Media fixtures: just enough bytes to satisfy each signature
// =========================================================================

pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
pub const GIF_BYTES: &[u8] = b"GIF89a";
pub const WEBP_BYTES: &[u8] = b"RIFF\x24\x00\x00\x00WEBP";

/// Parse an RFC 3339 timestamp. Panics on malformed input.
pub fn date(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap_or_else(|e| panic!("bad test date '{s}': {e}"))
}

// =========================================================================
// Posts directory fixture
// =========================================================================

/// A posts directory inside a temp "repository".
///
/// The repository root is the temp dir itself; posts live under
/// `content/posts`, which is also the layout's repository-relative root.
pub struct PostsDir {
    tmp: TempDir,
}

pub const REL_POSTS_DIR: &str = "content/posts";

impl PostsDir {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(REL_POSTS_DIR)).unwrap();
        Self { tmp }
    }

    /// Like [`PostsDir::new`] but without creating the posts directory.
    pub fn empty_repository() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn layout(&self) -> PostLayout {
        PostLayout::in_repository(self.tmp.path(), Path::new(REL_POSTS_DIR))
    }

    /// Write `<id>.md`.
    pub fn write_loose(&self, id: PostId, content: &str) {
        fs::write(self.layout().loose_file(id), content).unwrap();
    }

    /// Write `<id>/index.md` plus the given media files.
    pub fn write_unit(&self, id: PostId, content: &str, media: &[(&str, &[u8])]) {
        let layout = self.layout();
        fs::create_dir_all(layout.unit_dir(id)).unwrap();
        fs::write(layout.index_file(id), content).unwrap();
        for (name, bytes) in media {
            fs::write(layout.media_file(id, name), bytes).unwrap();
        }
    }

    /// Contents of `<id>.md`. Panics if missing.
    pub fn read_loose(&self, id: PostId) -> String {
        let path = self.layout().loose_file(id);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("loose post {} unreadable: {e}", path.display()))
    }

    /// Contents of `<id>/index.md`. Panics if missing.
    pub fn read_index(&self, id: PostId) -> String {
        let path = self.layout().index_file(id);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("index of post {} unreadable: {e}", path.display()))
    }

    /// Sorted names of every entry in `<id>/`.
    pub fn unit_entries(&self, id: PostId) -> Vec<String> {
        let dir = self.layout().unit_dir(id);
        let mut names: Vec<String> = fs::read_dir(&dir)
            .unwrap_or_else(|e| panic!("post dir {} unreadable: {e}", dir.display()))
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

// =========================================================================
// Path helpers
// =========================================================================

/// Relative path under the posts directory, as staged by the service.
pub fn rel(path: &str) -> String {
    format!("{REL_POSTS_DIR}/{path}")
}
