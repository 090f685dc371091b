//! Bookmark mutations for Kizuna.
//!
//! Input validation and the remote half of add, recategorize and reorder.
//! Everything here either runs before any network call (URL normalization) or
//! inside a spawned task (store calls); the in-memory side of each mutation is
//! applied by `BookmarkSession`.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};
use url::Url;

use crate::managers::bookmark_store::BookmarkStore;
use crate::services::metadata_resolver::MetadataResolver;
use crate::types::bookmark::{Bookmark, BookmarkUpdate, NewBookmark};
use crate::types::errors::{StoreError, ValidationError};

const CATEGORY_COLUMN: &str = "category";

/// Turns user input into a storable link.
///
/// The input is trimmed; empty input and input with inner whitespace are
/// rejected. A missing scheme gets `default_scheme`. Only http(s) links whose
/// host looks like a domain (`example.com`, `docs.rs`) are accepted.
pub fn normalize_bookmark_url(input: &str, default_scheme: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidDomain(trimmed.to_string()));
    }

    let candidate = match explicit_scheme(trimmed) {
        Some(_) => trimmed.to_string(),
        None => format!("{}://{}", default_scheme, trimmed),
    };

    let parsed =
        Url::parse(&candidate).map_err(|_| ValidationError::InvalidDomain(trimmed.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| ValidationError::InvalidDomain(trimmed.to_string()))?;
    if !is_domain_like(host) {
        return Err(ValidationError::InvalidDomain(host.to_string()));
    }

    Ok(candidate)
}

/// The scheme of `input` if it starts with `<scheme>://`.
fn explicit_scheme(input: &str) -> Option<&str> {
    let (scheme, _) = input.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(scheme)
    } else {
        None
    }
}

/// At least two dot-separated labels of `[a-z0-9-]` without edge hyphens,
/// ending in an alphabetic TLD of two or more characters.
pub fn is_domain_like(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let label_ok = |label: &&str| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    if !labels.iter().all(label_ok) {
        return false;
    }

    labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
}

/// Inserts a bookmark, retrying once without the category when the store's
/// schema predates the category column.
pub async fn insert_with_category_fallback(
    store: &dyn BookmarkStore,
    bookmark: NewBookmark,
) -> Result<Bookmark, StoreError> {
    if bookmark.category.is_none() {
        return store.insert(bookmark).await;
    }

    match store.insert(bookmark.clone()).await {
        Err(StoreError::UnknownColumn(column)) if column == CATEGORY_COLUMN => {
            warn!(owner = %bookmark.user_id, "store has no category column, inserting without it");
            store.insert(bookmark.without_category()).await
        }
        other => other,
    }
}

/// Resolves page metadata for a validated URL and inserts the bookmark.
pub async fn add_bookmark(
    store: Arc<dyn BookmarkStore>,
    resolver: Arc<dyn MetadataResolver>,
    owner_id: String,
    url: String,
    category: Option<String>,
) -> Result<Bookmark, StoreError> {
    let metadata = resolver.resolve(&url).await;
    debug!(owner = %owner_id, %url, title = %metadata.title, "metadata resolved");

    let bookmark = NewBookmark {
        user_id: owner_id,
        url,
        title: metadata.title,
        icon_url: metadata.icon,
        category,
    };
    insert_with_category_fallback(store.as_ref(), bookmark).await
}

/// Writes a batch of ranks concurrently. The batch fails if any write fails;
/// the first error in batch order is returned.
pub async fn persist_ranks(
    store: Arc<dyn BookmarkStore>,
    owner_id: String,
    ranks: Vec<(String, i64)>,
) -> Result<(), StoreError> {
    let writes = ranks.iter().map(|(id, rank)| {
        let store = store.clone();
        let owner_id = owner_id.as_str();
        async move {
            store
                .update(owner_id, id, BookmarkUpdate::SortOrder(*rank))
                .await
        }
    });

    let results = join_all(writes).await;
    let failures = results.iter().filter(|r| r.is_err()).count();
    if failures > 0 {
        warn!(owner = %owner_id, failures, total = ranks.len(), "rank batch failed");
    }
    results.into_iter().collect()
}

/// Sets or clears the user category of one bookmark.
pub async fn persist_category(
    store: Arc<dyn BookmarkStore>,
    owner_id: String,
    id: String,
    category: Option<String>,
) -> Result<(), StoreError> {
    store
        .update(&owner_id, &id, BookmarkUpdate::Category(category))
        .await
}

/// Removes one bookmark.
pub async fn delete_bookmark(
    store: Arc<dyn BookmarkStore>,
    owner_id: String,
    id: String,
) -> Result<(), StoreError> {
    store.delete(&owner_id, &id).await
}
