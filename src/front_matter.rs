//! TOML front matter for Zola posts.
//!
//! ```text
//! +++
//! title = "@channel [0x1234]"
//! date = 2024-02-20T15:45:00Z
//!
//! [extra]
//! images = ["image_0.jpg", "image_1.png"]
//! +++
//!
//! ```
//!
//! The `[extra]` table is written only when the post has media; templates test
//! for `page.extra.images` to decide whether to render a gallery.

use crate::post::Post;
use chrono::SecondsFormat;

pub const FRONT_MATTER_DELIMITER: &str = "+++";

pub fn build_front_matter(post: &Post) -> String {
    let mut lines = vec![
        FRONT_MATTER_DELIMITER.to_string(),
        format!("title = \"{}\"", post.title.replace('"', "\\\"")),
        format!(
            "date = {}",
            post.date.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        String::new(),
    ];

    if !post.image_names.is_empty() {
        let images: Vec<String> = post
            .image_names
            .iter()
            .map(|name| format!("\"{name}\""))
            .collect();
        lines.push("[extra]".to_string());
        lines.push(format!("images = [{}]", images.join(", ")));
    }

    lines.push(FRONT_MATTER_DELIMITER.to_string());
    lines.push(String::new());
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::date;

    fn post(title: &str, images: &[&str]) -> Post {
        Post::new(1, "Content", date("2024-01-15T10:30:00Z"))
            .with_title(title)
            .with_image_names(images.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn without_images() {
        assert_eq!(
            build_front_matter(&post("Test Post", &[])),
            "+++\ntitle = \"Test Post\"\ndate = 2024-01-15T10:30:00Z\n\n+++\n\n"
        );
    }

    #[test]
    fn with_images() {
        assert_eq!(
            build_front_matter(&post("Post with Images", &["image_0.jpg", "image_1.png"])),
            "+++\ntitle = \"Post with Images\"\ndate = 2024-01-15T10:30:00Z\n\n[extra]\nimages = [\"image_0.jpg\", \"image_1.png\"]\n+++\n\n"
        );
    }

    #[test]
    fn quotes_in_title_escaped() {
        let fm = build_front_matter(&post(r#"Title with "quotes""#, &[]));
        assert!(fm.contains(r#"title = "Title with \"quotes\"""#));
    }

    #[test]
    fn extra_section_absent_without_images() {
        let fm = build_front_matter(&post("No Images", &[]));
        assert!(!fm.contains("[extra]"));
        assert!(!fm.contains("images"));
    }

    #[test]
    fn offset_dates_keep_their_offset() {
        let mut p = post("t", &[]);
        p.date = date("2024-06-01T09:00:00+02:00");
        assert!(build_front_matter(&p).contains("date = 2024-06-01T09:00:00+02:00\n"));
    }

    #[test]
    fn parses_as_toml() {
        let fm = build_front_matter(&post(r#"say "hi""#, &["image_0.gif"]));
        let body = fm
            .trim()
            .trim_start_matches(FRONT_MATTER_DELIMITER)
            .trim_end_matches(FRONT_MATTER_DELIMITER);
        let value: toml::Value = toml::from_str(body).unwrap();

        assert_eq!(value["title"].as_str(), Some(r#"say "hi""#));
        assert!(value["date"].as_datetime().is_some());
        assert_eq!(
            value["extra"]["images"].as_array().map(|a| a.len()),
            Some(1)
        );
    }
}
