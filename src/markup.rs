//! HTML-flavoured message text → markdown for the static site.
//!
//! Messaging clients hand over a small HTML dialect: `<code>`, `<pre><code
//! class="language-x">`, `<blockquote>`, `<spoiler>` and bare newlines. The
//! transformer rewrites it as a fixed sequence of named stages operating on a
//! [`Pass`]: the working text plus a side-table of fenced blocks that have been
//! lifted out of it.
//!
//! ```text
//! escape-inline-code   <code>a < b</code>          → <code>a &lt; b</code>
//! extract-fences       <pre><code class=…>…</pre>  → placeholder, body kept aside
//! join-blockquotes     <blockquote>a\nb            → <blockquote>a<br>b
//! hard-breaks          a\nb                        → a  \nb
//! restore-fences       placeholder                 → ```lang\nbody\n```
//! spoilers             <spoiler>x</spoiler>        → <span class="spoiler">x</span>
//! ```
//!
//! Order matters: fenced blocks must leave the text before `hard-breaks` runs,
//! otherwise their interior lines would pick up trailing double spaces.
//!
//! HTML entities are never decoded. `&lt;` in the input stays `&lt;`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<code>([\s\S]*?)</code>").unwrap());

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<pre><code class="language-(.*?)">([\s\S]*?)</code></pre>"#).unwrap()
});

static BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<blockquote>([\s\S]*?)</blockquote>").unwrap());

static SPOILER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<spoiler>([\s\S]*?)</spoiler>").unwrap());

/// Private-use delimiter around fence placeholders. Never produced by
/// messaging clients, and the closing delimiter keeps `#1` from matching
/// inside `#10`.
const PLACEHOLDER_MARK: char = '\u{E000}';

/// Working state threaded through the stages.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Pass {
    pub text: String,
    /// Fenced blocks lifted out of `text`, as `(placeholder, rendered block)`.
    pub fences: Vec<(String, String)>,
}

impl Pass {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fences: Vec::new(),
        }
    }
}

pub type Stage = fn(&mut Pass);

/// The pipeline, in execution order.
pub const STAGES: &[(&str, Stage)] = &[
    ("escape-inline-code", escape_inline_code),
    ("extract-fences", extract_fences),
    ("join-blockquotes", join_blockquotes),
    ("hard-breaks", hard_breaks),
    ("restore-fences", restore_fences),
    ("spoilers", spoilers),
];

/// Convert message HTML to site markdown.
pub fn transform(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let mut pass = Pass::new(html);
    for (_, stage) in STAGES {
        stage(&mut pass);
    }
    pass.text
}

pub fn escape_inline_code(pass: &mut Pass) {
    pass.text = INLINE_CODE
        .replace_all(&pass.text, |caps: &Captures| {
            let escaped = caps[1].replace('<', "&lt;").replace('>', "&gt;");
            format!("<code>{escaped}</code>")
        })
        .into_owned();
}

pub fn extract_fences(pass: &mut Pass) {
    let fences = &mut pass.fences;
    pass.text = FENCED_BLOCK
        .replace_all(&pass.text, |caps: &Captures| {
            let language = &caps[1];
            let body = caps[2].trim_end_matches('\n');
            let placeholder = format!(
                "{PLACEHOLDER_MARK}fence#{}{PLACEHOLDER_MARK}",
                fences.len()
            );
            fences.push((placeholder.clone(), format!("```{language}\n{body}\n```")));
            placeholder
        })
        .into_owned();
}

pub fn join_blockquotes(pass: &mut Pass) {
    pass.text = BLOCKQUOTE
        .replace_all(&pass.text, |caps: &Captures| {
            format!("<blockquote>{}</blockquote>", caps[1].replace('\n', "<br>"))
        })
        .into_owned();
}

/// Every newline becomes a markdown hard break; a blank line stays a plain
/// paragraph separator.
pub fn hard_breaks(pass: &mut Pass) {
    pass.text = pass
        .text
        .replace('\n', "  \n")
        .replace("  \n  \n", "  \n\n");
}

pub fn restore_fences(pass: &mut Pass) {
    for (placeholder, block) in pass.fences.drain(..) {
        pass.text = pass.text.replace(&placeholder, &block);
    }
}

pub fn spoilers(pass: &mut Pass) {
    pass.text = SPOILER
        .replace_all(&pass.text, r#"<span class="spoiler">${1}</span>"#)
        .into_owned();
}
