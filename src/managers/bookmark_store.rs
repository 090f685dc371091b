//! Bookmark store for Kizuna.
//!
//! Defines the `BookmarkStore` contract the session talks to (select, insert,
//! update, delete, realtime feed) and `SqliteBookmarkStore`, an implementation
//! backed by SQLite via `rusqlite` that publishes a row-change feed for every
//! write it performs.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use crate::database::Database;
use crate::types::bookmark::{Bookmark, BookmarkUpdate, NewBookmark};
use crate::types::change_event::ChangeEvent;
use crate::types::errors::StoreError;

/// Capacity of the realtime fan-out. Slow subscribers beyond this see `Lagged`.
const FEED_CAPACITY: usize = 256;

/// Remote data store operations. Every call is scoped to one owner.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// All of the owner's bookmarks, rank ascending with nulls first, then newest first.
    async fn select_all(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError>;
    /// Inserts a bookmark and returns the stored row.
    async fn insert(&self, bookmark: NewBookmark) -> Result<Bookmark, StoreError>;
    /// Updates one field of the row matching both `id` and `owner_id`.
    async fn update(&self, owner_id: &str, id: &str, update: BookmarkUpdate) -> Result<(), StoreError>;
    /// Deletes the row matching both `id` and `owner_id`.
    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError>;
    /// Realtime change feed filtered to `owner_id`.
    fn subscribe(&self, owner_id: &str) -> ChangeFeed;
}

/// One item from a change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    /// Raw, not yet validated row-change payload.
    Payload(Value),
    /// The subscriber fell behind and missed this many payloads.
    Lagged(u64),
}

/// Owner-filtered realtime subscription. Dropping it cancels the subscription.
pub struct ChangeFeed {
    owner_id: String,
    rx: broadcast::Receiver<Value>,
}

impl ChangeFeed {
    pub fn new(owner_id: impl Into<String>, rx: broadcast::Receiver<Value>) -> Self {
        Self {
            owner_id: owner_id.into(),
            rx,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Next payload for this owner. `None` once the store side is gone.
    ///
    /// Payloads naming a different owner are skipped here. Payloads that name
    /// no owner at all are passed on; the reconciler decides what to do with them.
    pub async fn next(&mut self) -> Option<FeedItem> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => {
                    if payload_owner(&payload).is_some_and(|owner| owner != self.owner_id) {
                        continue;
                    }
                    return Some(FeedItem::Payload(payload));
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    return Some(FeedItem::Lagged(missed))
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Like [`ChangeFeed::next`] but returns `None` instead of waiting.
    pub fn try_next(&mut self) -> Option<FeedItem> {
        loop {
            match self.rx.try_recv() {
                Ok(payload) => {
                    if payload_owner(&payload).is_some_and(|owner| owner != self.owner_id) {
                        continue;
                    }
                    return Some(FeedItem::Payload(payload));
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    return Some(FeedItem::Lagged(missed))
                }
                Err(_) => return None,
            }
        }
    }
}

fn payload_owner(payload: &Value) -> Option<&str> {
    ["new", "old"]
        .iter()
        .find_map(|key| payload.get(*key)?.get("user_id")?.as_str())
}

/// Bookmark store backed by a SQLite database.
///
/// Every call runs on tokio's blocking pool, so a busy database file never
/// stalls the session loop.
pub struct SqliteBookmarkStore {
    db: Arc<Mutex<Database>>,
    changes: broadcast::Sender<Value>,
}

impl SqliteBookmarkStore {
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes,
        }
    }

    /// Fresh in-memory store at the current schema.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Returns the current UNIX timestamp in milliseconds.
    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let db = db
                .lock()
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
            f(db.connection())
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }

    fn has_category_column(conn: &Connection) -> Result<bool, StoreError> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('bookmarks')")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for name in names {
            if name? == "category" {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn select_columns(conn: &Connection) -> Result<(&'static str, bool), StoreError> {
        let with_category = Self::has_category_column(conn)?;
        let columns = if with_category {
            "id, user_id, url, title, icon_url, sort_order, created_at, category"
        } else {
            "id, user_id, url, title, icon_url, sort_order, created_at"
        };
        Ok((columns, with_category))
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row, with_category: bool) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            user_id: row.get(1)?,
            url: row.get(2)?,
            title: row.get(3)?,
            icon_url: row.get(4)?,
            sort_order: row.get(5)?,
            created_at: row.get(6)?,
            category: if with_category { row.get(7)? } else { None },
        })
    }

    fn fetch_one(conn: &Connection, owner_id: &str, id: &str) -> Result<Bookmark, StoreError> {
        let (columns, with_category) = Self::select_columns(conn)?;
        let sql = format!("SELECT {} FROM bookmarks WHERE id = ?1 AND user_id = ?2", columns);
        conn.query_row(&sql, params![id, owner_id], |row| {
            Self::row_to_bookmark(row, with_category)
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(id.to_string()),
            other => other.into(),
        })
    }

    fn publish(&self, event: ChangeEvent) {
        // Err only means no feed is open.
        let _ = self.changes.send(event.to_payload());
    }

    /// Pushes a raw payload onto the feed as if it had come from the store.
    pub fn publish_raw(&self, payload: Value) {
        let _ = self.changes.send(payload);
    }

    fn select_all_blocking(conn: &Connection, owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let (columns, with_category) = Self::select_columns(conn)?;
        let sql = format!(
            "SELECT {} FROM bookmarks WHERE user_id = ?1 \
             ORDER BY sort_order ASC NULLS FIRST, created_at DESC",
            columns
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id], |row| {
            Self::row_to_bookmark(row, with_category)
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn insert_blocking(conn: &Connection, bookmark: NewBookmark) -> Result<Bookmark, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Self::now_millis();

        match &bookmark.category {
            Some(category) => conn.execute(
                "INSERT INTO bookmarks (id, user_id, url, title, icon_url, category, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    bookmark.user_id,
                    bookmark.url,
                    bookmark.title,
                    bookmark.icon_url,
                    category,
                    created_at
                ],
            )?,
            None => conn.execute(
                "INSERT INTO bookmarks (id, user_id, url, title, icon_url, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    bookmark.user_id,
                    bookmark.url,
                    bookmark.title,
                    bookmark.icon_url,
                    created_at
                ],
            )?,
        };

        Ok(Bookmark {
            id,
            user_id: bookmark.user_id,
            url: bookmark.url,
            title: bookmark.title,
            icon_url: bookmark.icon_url,
            category: bookmark.category,
            sort_order: None,
            created_at,
        })
    }

    fn update_blocking(
        conn: &Connection,
        owner_id: &str,
        id: &str,
        update: &BookmarkUpdate,
    ) -> Result<Bookmark, StoreError> {
        let affected = match update {
            BookmarkUpdate::Category(category) => conn.execute(
                "UPDATE bookmarks SET category = ?1 WHERE id = ?2 AND user_id = ?3",
                params![category, id, owner_id],
            )?,
            BookmarkUpdate::SortOrder(rank) => conn.execute(
                "UPDATE bookmarks SET sort_order = ?1 WHERE id = ?2 AND user_id = ?3",
                params![rank, id, owner_id],
            )?,
        };
        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Self::fetch_one(conn, owner_id, id)
    }
}

#[async_trait]
impl BookmarkStore for SqliteBookmarkStore {
    async fn select_all(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| Self::select_all_blocking(conn, &owner_id))
            .await
    }

    async fn insert(&self, bookmark: NewBookmark) -> Result<Bookmark, StoreError> {
        let stored = self
            .with_conn(move |conn| Self::insert_blocking(conn, bookmark))
            .await?;

        debug!(id = %stored.id, owner = %stored.user_id, "bookmark inserted");
        self.publish(ChangeEvent::Insert(stored.clone()));
        Ok(stored)
    }

    async fn update(&self, owner_id: &str, id: &str, update: BookmarkUpdate) -> Result<(), StoreError> {
        let (owner, row) = (owner_id.to_string(), id.to_string());
        let updated = self
            .with_conn(move |conn| Self::update_blocking(conn, &owner, &row, &update))
            .await?;

        self.publish(ChangeEvent::Update(updated));
        Ok(())
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        let (owner, row) = (owner_id.to_string(), id.to_string());
        let affected = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                    params![row, owner],
                )?)
            })
            .await?;

        // Deleting a row that is already gone is not an error: another surface got there first.
        if affected > 0 {
            self.publish(ChangeEvent::Delete {
                id: id.to_string(),
                user_id: Some(owner_id.to_string()),
            });
        }
        Ok(())
    }

    fn subscribe(&self, owner_id: &str) -> ChangeFeed {
        ChangeFeed::new(owner_id, self.changes.subscribe())
    }
}
