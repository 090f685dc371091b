use serde::{Deserialize, Serialize};

/// A saved URL record owned by exactly one user.
///
/// `sort_order` is the manual rank assigned by drag reordering; `None` means the
/// bookmark has never been positioned by hand. `created_at` is unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    pub created_at: i64,
}

/// Insert payload. The store generates `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub icon_url: Option<String>,
    pub category: Option<String>,
}

impl NewBookmark {
    /// Same payload with the category field left out entirely.
    pub fn without_category(self) -> Self {
        Self {
            category: None,
            ..self
        }
    }
}

/// A single-field update applied to one bookmark row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum BookmarkUpdate {
    /// `None` clears the user label and reverts to automatic classification.
    Category(Option<String>),
    SortOrder(i64),
}

/// Page metadata returned by the metadata resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub icon: Option<String>,
}

impl PageMetadata {
    /// The degraded result used whenever a page cannot be inspected.
    pub fn fallback(url: &str) -> Self {
        Self {
            title: url.to_string(),
            icon: None,
        }
    }
}

/// What the user typed into the add form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBookmarkRequest {
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
}
