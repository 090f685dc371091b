use serde::{Deserialize, Serialize};

use super::bookmark::Bookmark;
use super::notice::NoticeKind;

/// Pseudo category meaning "no filter".
pub const ALL_CATEGORY: &str = "All";

/// Bookmarks sharing one display category, already in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub label: String,
    pub bookmarks: Vec<Bookmark>,
}

/// A filter tab with its member count. The first tab is always `All`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTab {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeView {
    pub kind: NoticeKind,
    pub message: String,
}

/// Render-ready snapshot of a session.
///
/// `groups` holds only the categories visible under the active filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkView {
    pub owner_id: Option<String>,
    pub total: usize,
    pub active_category: String,
    pub tabs: Vec<CategoryTab>,
    pub groups: Vec<CategoryGroup>,
    pub is_refreshing: bool,
    pub is_adding: bool,
    pub is_deleting: bool,
    pub is_reordering: bool,
    pub pending_delete: Option<String>,
    pub add_draft: Option<String>,
    pub notice: Option<NoticeView>,
}
