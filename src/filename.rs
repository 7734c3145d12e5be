//! Download filenames derived from page titles

use regex::Regex;
use std::sync::OnceLock;

/// Longest stem kept before the `.md` extension, in characters
pub const MAX_STEM_CHARS: usize = 50;

pub const PAGE_FALLBACK: &str = "page";
pub const SELECTION_FALLBACK: &str = "selection";

/// Filesystem-safe `.md` filename for `title`
///
/// Characters illegal on common filesystems are removed, whitespace runs
/// become `-`, and the result is lower-cased and cut to
/// [`MAX_STEM_CHARS`]. An empty stem is replaced by `fallback`.
///
/// ```rust
/// use page2md::filename::generate_filename;
///
/// assert_eq!(generate_filename("Hello: World?", "page"), "hello-world.md");
/// assert_eq!(generate_filename("***", "selection"), "selection.md");
/// ```
pub fn generate_filename(title: &str, fallback: &str) -> String {
    static ILLEGAL: OnceLock<Option<Regex>> = OnceLock::new();
    static WHITESPACE: OnceLock<Option<Regex>> = OnceLock::new();

    let stripped = match ILLEGAL.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).ok()) {
        Some(regex) => regex.replace_all(title, "").into_owned(),
        None => title.to_string(),
    };
    let hyphenated = match WHITESPACE.get_or_init(|| Regex::new(r"\s+").ok()) {
        Some(regex) => regex.replace_all(&stripped, "-").into_owned(),
        None => stripped,
    };

    let stem: String = hyphenated
        .to_lowercase()
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();

    if stem.is_empty() {
        format!("{fallback}.md")
    } else {
        format!("{stem}.md")
    }
}
