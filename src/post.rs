//! The post record handed to the lifecycle service.
//!
//! A [`Post`] is transient: it lives for one create or edit call. Only its
//! rendered projection (front matter + transformed markup + media files) is
//! persisted, see [`crate::layout`] for the on-disk shapes.

use chrono::{DateTime, FixedOffset};

/// Identifier of the source message a post was built from.
///
/// Also the name of the post unit on disk (`<id>.md` or `<id>/`).
pub type PostId = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: PostId,
    /// Display title. Empty means "derive from content and channel".
    pub title: String,
    /// Raw HTML-flavoured message text, before transformation.
    pub content: String,
    pub date: DateTime<FixedOffset>,
    /// Media file names for the front matter.
    ///
    /// Filled by the service on create. On edit a caller may pre-seed it to
    /// hint the extension every existing media slot should be renamed to.
    pub image_names: Vec<String>,
}

impl Post {
    pub fn new(id: PostId, content: impl Into<String>, date: DateTime<FixedOffset>) -> Self {
        Self {
            id,
            title: String::new(),
            content: content.into(),
            date,
            image_names: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_image_names(mut self, names: Vec<String>) -> Self {
        self.image_names = names;
        self
    }
}
