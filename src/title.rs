//! Post titles from trailing contract addresses.
//!
//! Channel posts often end with an address line such as `0x1234abcd`. When a
//! post has no explicit title, that address is promoted into it
//! (`"@channel [0x1234abcd]"`) and removed from the body so it is not shown
//! twice.

use regex::Regex;
use std::sync::LazyLock;

/// An optional hard-break line ending, then `0x` + hex digits at the end of a
/// line (optionally followed by a single newline).
static ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(\s\s\n)?0x[0-9a-fA-F]+\n?$").unwrap());

/// `"<fallback> [<address>]"` when `content` ends a line with an address,
/// otherwise `fallback`.
pub fn extract_title(content: &str, fallback: &str) -> String {
    if content.is_empty() {
        return fallback.to_string();
    }
    match ADDRESS.find(content) {
        Some(m) => format!("{fallback} [{}]", m.as_str().trim()),
        None => fallback.to_string(),
    }
}

/// Strip every trailing address (and the hard break before it).
pub fn remove_address_pattern(content: &str) -> String {
    ADDRESS.replace_all(content, "").into_owned()
}
