//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## create / edit
//!
//! ```text
//! Post 4215 (directory) → @channel [0x1234]
//!     Staged: content/posts/4215/index.md
//!     Staged: content/posts/4215/image_0.jpg
//! ```
//!
//! An edit that snapped to a different unit says so on the header line:
//!
//! ```text
//! Post 200 (directory), edited as 205
//!     Staged: content/posts/200/image_5.png
//! ```
//!
//! ## delete
//!
//! ```text
//! Deleted 2 posts: 600, 601
//!     Missing: 999
//!     Commit: Delete post(s): 600,601,999
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability; [`print_lines`] writes the result to stdout. With `--json`
//! the report is printed as pretty JSON instead via [`print_json`].

use crate::layout::UnitShape;
use crate::lifecycle::{Deletion, PostChange};
use crate::post::PostId;
use crate::vcs::SyncOutcome;
use serde::Serialize;
use std::path::PathBuf;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn shape_label(shape: UnitShape) -> &'static str {
    match shape {
        UnitShape::Loose => "loose",
        UnitShape::Directory => "directory",
        UnitShape::Absent => "absent",
    }
}

fn join_ids(ids: &[PostId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn path_lines(label: &str, paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| format!("{}{label}: {}", indent(1), p.display()))
        .collect()
}

// ============================================================================
// create / edit
// ============================================================================

pub fn format_post_change(change: &PostChange) -> Vec<String> {
    let mut header = format!("Post {} ({})", change.id, shape_label(change.shape));
    if change.requested_id != change.id {
        header.push_str(&format!(", edited as {}", change.requested_id));
    }
    if let Some(title) = &change.title {
        header.push_str(&format!(" \u{2192} {title}"));
    }

    let mut lines = vec![header];
    lines.extend(path_lines("Staged", &change.staged));
    lines.extend(path_lines("Unstaged", &change.unstaged));
    if change.staged.is_empty() && change.unstaged.is_empty() {
        lines.push(format!("{}Nothing changed", indent(1)));
    }
    lines
}

// ============================================================================
// delete
// ============================================================================

pub fn format_deletion(deletion: &Deletion) -> Vec<String> {
    let count = deletion.deleted.len();
    let noun = if count == 1 { "post" } else { "posts" };
    let mut lines = if count == 0 {
        vec!["Deleted no posts".to_string()]
    } else {
        vec![format!(
            "Deleted {count} {noun}: {}",
            join_ids(&deletion.deleted)
        )]
    };
    if !deletion.missing.is_empty() {
        lines.push(format!("{}Missing: {}", indent(1), join_ids(&deletion.missing)));
    }
    if !deletion.skipped.is_empty() {
        lines.push(format!("{}Skipped: {}", indent(1), join_ids(&deletion.skipped)));
    }
    lines.push(format!("{}Commit: {}", indent(1), deletion.message));
    lines
}

// ============================================================================
// publish / sync
// ============================================================================

pub fn format_published(message: &str) -> Vec<String> {
    vec![format!("Published: {message}")]
}

pub fn format_sync(outcome: &SyncOutcome) -> Vec<String> {
    match outcome {
        SyncOutcome::Cloned { url, path } => {
            vec![format!("Cloned {url} \u{2192} {}", path.display())]
        }
        SyncOutcome::Pulled { branch } => vec![format!("Pulled {branch}")],
    }
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// JSON
// ============================================================================

pub fn format_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", format_json(value)?);
    Ok(())
}
