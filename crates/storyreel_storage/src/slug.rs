//! Filesystem-safe directory names.

use regex::Regex;
use std::sync::LazyLock;

/// Longest slug produced.
pub const MAX_SLUG_LEN: usize = 48;

/// Slug used when nothing usable remains.
pub const DEFAULT_SLUG: &str = "untitled";

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s_-]").expect("valid regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]+").expect("valid regex"));

/// Turn free text into a lowercase, hyphen-separated directory name.
///
/// # Examples
///
/// ```
/// use storyreel_storage::slugify;
///
/// assert_eq!(slugify("A Lighthouse Keeper's   Last_Night!"), "a-lighthouse-keepers-last-night");
/// assert_eq!(slugify("???"), "untitled");
/// ```
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let kept = DISALLOWED.replace_all(&lower, "");
    let joined = SEPARATORS.replace_all(kept.trim(), "-");
    let mut slug: String = joined.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}
