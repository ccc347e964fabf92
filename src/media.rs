//! Media sniffing and naming.
//!
//! Attachments arrive as raw bytes with no reliable filename, so the format is
//! decided by magic number alone:
//!
//! | Prefix | Format |
//! |---|---|
//! | `FF D8 FF` | JPEG |
//! | `89 50 4E 47` | PNG |
//! | `47 49 46` | GIF |
//! | `RIFF` … `WEBP` at offset 8 | WebP |
//!
//! Anything else (including buffers under four bytes) is treated as JPEG, the
//! format messaging clients re-encode photos to. Classification never fails.
//!
//! Media files inside a post directory are named `image_<n>.<ext>`.

/// Filename prefix shared by every media file in a post directory.
pub const MEDIA_PREFIX: &str = "image_";

/// Image formats the classifier can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Lowercase extension token used in media filenames.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
        }
    }
}

/// Sniff the format of a media buffer.
pub fn classify_image(data: &[u8]) -> ImageFormat {
    if data.len() < 4 {
        return ImageFormat::Jpeg;
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return ImageFormat::Jpeg;
    }
    if data.len() >= 8 && data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return ImageFormat::Png;
    }
    if data.len() >= 6 && data.starts_with(b"GIF") {
        return ImageFormat::Gif;
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return ImageFormat::WebP;
    }
    ImageFormat::Jpeg
}

/// `image_<index>.<ext>`
pub fn image_file_name(index: impl std::fmt::Display, extension: &str) -> String {
    format!("{MEDIA_PREFIX}{index}.{extension}")
}

/// Name for the `index`-th media buffer, extension sniffed from its bytes.
pub fn media_file_name(index: impl std::fmt::Display, data: &[u8]) -> String {
    image_file_name(index, classify_image(data).extension())
}

/// Extension carried by a caller-supplied media name hint.
///
/// `"image_0.png"` → `"png"`. A hint without a dot falls back to `jpg`.
pub fn format_hint(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => ImageFormat::Jpeg.extension(),
    }
}
