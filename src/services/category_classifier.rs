//! Category Classifier for Kizuna.
//!
//! Maps a bookmark to its display category. A user label always wins; otherwise
//! `"<title> <url>"` is matched against fixed keyword sets in priority order.

use std::cmp::Ordering;

use crate::types::bookmark::Bookmark;
use crate::types::view::ALL_CATEGORY;

/// Well-known categories in display order.
pub const KNOWN_CATEGORIES: [&str; 8] = [
    "Dev",
    "Docs",
    "Video",
    "Social",
    "News",
    "Shopping",
    "Reference",
    "Other",
];

pub const OTHER: &str = "Other";

/// Keyword sets checked in this order; the first hit decides.
const PATTERNS: [(&str, &[&str]); 7] = [
    (
        "Dev",
        &[
            "github", "gitlab", "bitbucket", "stackoverflow", "vercel", "netlify", "npmjs",
            "medium.com/@", "hashnode", "dev.to",
        ],
    ),
    (
        "Docs",
        &[
            "docs.", "readme", "notion", "confluence", "wiki", "developer.mozilla", "w3schools",
            "mdn",
        ],
    ),
    (
        "Video",
        &["youtube", "youtu.be", "vimeo", "twitch", "dailymotion", "netflix", "primevideo"],
    ),
    (
        "Social",
        &[
            "x.com", "twitter", "instagram", "facebook", "linkedin", "reddit", "discord",
            "threads.net", "tiktok",
        ],
    ),
    (
        "News",
        &[
            "news", "times", "post", "herald", "bbc", "cnn", "reuters", "bloomberg", "nytimes",
            "thehindu",
        ],
    ),
    (
        "Shopping",
        &[
            "amazon", "flipkart", "ebay", "etsy", "shop", "store", "cart", "aliexpress",
            "walmart", "target",
        ],
    ),
    (
        "Reference",
        &[
            "wikipedia", "investopedia", "dictionary", "britannica", "archive", "scholar",
            "arxiv", "pubmed",
        ],
    ),
];

/// Trims a user label and collapses every whitespace run to a single space.
/// Returns `None` when nothing is left, or when the label is the reserved
/// `All` filter name in any casing.
pub fn normalize_category(value: Option<&str>) -> Option<String> {
    let collapsed = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || collapsed.eq_ignore_ascii_case(ALL_CATEGORY) {
        None
    } else {
        Some(collapsed)
    }
}

/// [`normalize_category`] followed by truncation to `max_chars` characters.
pub fn normalize_category_label(value: &str, max_chars: usize) -> Option<String> {
    let normalized = normalize_category(Some(value))?;
    let truncated: String = normalized.chars().take(max_chars).collect();
    // Truncation can leave a trailing space behind.
    let truncated = truncated.trim_end().to_string();
    if truncated.is_empty() || truncated.eq_ignore_ascii_case(ALL_CATEGORY) {
        None
    } else {
        Some(truncated)
    }
}

/// Category inferred from title and URL alone.
pub fn auto_category(title: &str, url: &str) -> &'static str {
    let source = format!("{} {}", title, url).to_lowercase();
    PATTERNS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| source.contains(k)))
        .map(|(label, _)| *label)
        .unwrap_or(OTHER)
}

/// Display category of a bookmark.
pub fn classify(bookmark: &Bookmark) -> String {
    match normalize_category(bookmark.category.as_deref()) {
        Some(custom) => custom,
        None => auto_category(&bookmark.title, &bookmark.url).to_string(),
    }
}

/// Position of a label in the well-known list, if it is one.
pub fn category_rank(label: &str) -> Option<usize> {
    KNOWN_CATEGORIES.iter().position(|known| *known == label)
}

/// Display order of category labels: well-known first in fixed order, then
/// everything else lexicographically.
pub fn compare_categories(a: &str, b: &str) -> Ordering {
    match (category_rank(a), category_rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
