//! Bookmark Reconciler for Kizuna.
//!
//! Owns one owner's in-memory bookmark collection and merges the three input
//! streams into it: full refetches, realtime row changes and local optimistic
//! edits. Every transition is an idempotent replace/upsert/remove by id, so the
//! arrival order of events does not matter for the final state.
//!
//! After each change the grouped view is re-derived: bookmarks are partitioned
//! with the category classifier, ordered with the ordering engine, and the
//! categories themselves are put in display order. The reconciler performs no
//! I/O; `BookmarkSession` drives it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::services::category_classifier::{classify, compare_categories};
use crate::services::ordering::{sort_bookmarks, swap_and_renumber};
use crate::types::bookmark::{AddBookmarkRequest, Bookmark};
use crate::types::change_event::ChangeEvent;
use crate::types::errors::EventError;
use crate::types::notice::{Notice, NoticeKind};
use crate::types::view::{BookmarkView, CategoryGroup, CategoryTab, NoticeView, ALL_CATEGORY};

/// A local change applied before the store confirms it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimisticChange {
    Remove(String),
    SetCategory { id: String, category: Option<String> },
    SetRanks(Vec<(String, i64)>),
    Upsert(Bookmark),
}

/// Result of a drag-swap: the full renumbering and the subset that differs
/// from what is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub ranks: Vec<(String, i64)>,
    pub changed: Vec<(String, i64)>,
}

pub struct BookmarkReconciler {
    owner_id: Option<String>,
    /// Kept sorted with `ordering::compare`.
    bookmarks: Vec<Bookmark>,
    groups: Vec<CategoryGroup>,
    active_category: String,
    refreshes: usize,
    pending_delete: Option<String>,
    deletes_in_flight: usize,
    add_draft: Option<AddBookmarkRequest>,
    adding: bool,
    reordering: bool,
    notice: Option<Notice>,
    notice_ttl: Duration,
}

impl BookmarkReconciler {
    pub fn new(owner_id: Option<String>, notice_ttl: Duration) -> Self {
        Self {
            owner_id,
            bookmarks: Vec::new(),
            groups: Vec::new(),
            active_category: ALL_CATEGORY.to_string(),
            refreshes: 0,
            pending_delete: None,
            deletes_in_flight: 0,
            add_draft: None,
            adding: false,
            reordering: false,
            notice: None,
            notice_ttl,
        }
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// All bookmarks in display order.
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn get(&self, id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    /// Every non-empty category in display order.
    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn active_category(&self) -> &str {
        &self.active_category
    }

    /// Drops everything and starts over for a different (or no) owner.
    pub fn reset(&mut self, owner_id: Option<String>) {
        let ttl = self.notice_ttl;
        *self = Self::new(owner_id, ttl);
    }

    // === Refetch ===

    /// Replaces the whole collection with a fresh read from the store.
    /// Rows belonging to anyone else are dropped.
    pub fn replace_all(&mut self, rows: Vec<Bookmark>) {
        let owner = self.owner_id.as_deref();
        self.bookmarks = rows
            .into_iter()
            .filter(|b| Some(b.user_id.as_str()) == owner)
            .collect();
        self.rederive();
    }

    pub fn begin_refresh(&mut self) {
        self.refreshes += 1;
    }

    pub fn finish_refresh(&mut self) {
        self.refreshes = self.refreshes.saturating_sub(1);
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshes > 0
    }

    // === Realtime ===

    /// Applies one validated realtime event.
    ///
    /// Inserts and updates upsert by id, deletes remove by id. Events for
    /// another owner are refused.
    pub fn apply_realtime_event(&mut self, event: ChangeEvent) -> Result<(), EventError> {
        let owner = self
            .owner_id
            .as_deref()
            .ok_or_else(|| EventError::OwnerMismatch(event.owner().unwrap_or_default().to_string()))?;
        if let Some(event_owner) = event.owner() {
            if event_owner != owner {
                return Err(EventError::OwnerMismatch(event_owner.to_string()));
            }
        }

        match event {
            ChangeEvent::Insert(bookmark) | ChangeEvent::Update(bookmark) => self.upsert(bookmark),
            ChangeEvent::Delete { id, .. } => self.bookmarks.retain(|b| b.id != id),
        }
        self.rederive();
        Ok(())
    }

    // === Optimistic ===

    pub fn apply_optimistic(&mut self, change: OptimisticChange) {
        match change {
            OptimisticChange::Remove(id) => self.bookmarks.retain(|b| b.id != id),
            OptimisticChange::SetCategory { id, category } => {
                if let Some(b) = self.bookmarks.iter_mut().find(|b| b.id == id) {
                    b.category = category;
                }
            }
            OptimisticChange::SetRanks(ranks) => {
                let by_id: HashMap<&str, i64> =
                    ranks.iter().map(|(id, rank)| (id.as_str(), *rank)).collect();
                for b in &mut self.bookmarks {
                    if let Some(rank) = by_id.get(b.id.as_str()) {
                        b.sort_order = Some(*rank);
                    }
                }
            }
            OptimisticChange::Upsert(bookmark) => {
                if Some(bookmark.user_id.as_str()) == self.owner_id.as_deref() {
                    self.upsert(bookmark);
                }
            }
        }
        self.rederive();
    }

    fn upsert(&mut self, bookmark: Bookmark) {
        match self.bookmarks.iter_mut().find(|b| b.id == bookmark.id) {
            Some(slot) => *slot = bookmark,
            None => self.bookmarks.push(bookmark),
        }
    }

    // === Filter ===

    /// Switches the category filter. Unknown or empty categories select `All`.
    pub fn select_category(&mut self, label: &str) {
        self.active_category = label.to_string();
        self.fallback_active_category();
    }

    fn fallback_active_category(&mut self) {
        if self.active_category != ALL_CATEGORY
            && !self.groups.iter().any(|g| g.label == self.active_category)
        {
            self.active_category = ALL_CATEGORY.to_string();
        }
    }

    // === Delete ===

    /// First step of a delete. Returns false for unknown ids.
    pub fn request_delete(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.pending_delete = Some(id.to_string());
        true
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn take_pending_delete(&mut self) -> Option<String> {
        self.pending_delete.take()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn begin_delete(&mut self) {
        self.deletes_in_flight += 1;
    }

    pub fn finish_delete(&mut self) {
        self.deletes_in_flight = self.deletes_in_flight.saturating_sub(1);
    }

    pub fn is_deleting(&self) -> bool {
        self.deletes_in_flight > 0
    }

    // === Add ===

    /// Marks an add as in flight. Returns false if one already is.
    pub fn begin_add(&mut self, request: AddBookmarkRequest) -> bool {
        if self.adding {
            return false;
        }
        self.add_draft = Some(request);
        self.adding = true;
        true
    }

    /// Keeps rejected input around so the host can show it again.
    pub fn keep_draft(&mut self, request: AddBookmarkRequest) {
        self.add_draft = Some(request);
    }

    /// Ends the in-flight add. The draft is cleared only when the insert was confirmed.
    pub fn finish_add(&mut self, confirmed: bool) {
        self.adding = false;
        if confirmed {
            self.add_draft = None;
        }
    }

    pub fn add_draft(&self) -> Option<&AddBookmarkRequest> {
        self.add_draft.as_ref()
    }

    pub fn is_adding(&self) -> bool {
        self.adding
    }

    // === Reorder ===

    /// Computes the drag-swap of `dragged` onto `target` over the whole list.
    pub fn plan_swap(&self, dragged: &str, target: &str) -> Option<ReorderPlan> {
        let ranks = swap_and_renumber(&self.bookmarks, dragged, target)?;
        let changed = ranks
            .iter()
            .filter(|(id, rank)| self.get(id).and_then(|b| b.sort_order) != Some(*rank))
            .cloned()
            .collect();
        Some(ReorderPlan { ranks, changed })
    }

    pub fn set_reordering(&mut self, reordering: bool) {
        self.reordering = reordering;
    }

    pub fn is_reordering(&self) -> bool {
        self.reordering
    }

    // === Notices ===

    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) {
        self.notice = Some(Notice::new(kind, message, now, self.notice_ttl));
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn notice_deadline(&self) -> Option<Instant> {
        self.notice.as_ref().map(|n| n.expires_at)
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Drops the notice if its time is up. Returns true when one was dropped.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
            return true;
        }
        false
    }

    // === View ===

    fn rederive(&mut self) {
        sort_bookmarks(&mut self.bookmarks);

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<CategoryGroup> = Vec::new();
        for bookmark in &self.bookmarks {
            let label = classify(bookmark);
            match index.get(&label) {
                Some(&i) => groups[i].bookmarks.push(bookmark.clone()),
                None => {
                    index.insert(label.clone(), groups.len());
                    groups.push(CategoryGroup {
                        label,
                        bookmarks: vec![bookmark.clone()],
                    });
                }
            }
        }
        groups.sort_by(|a, b| compare_categories(&a.label, &b.label));

        self.groups = groups;
        self.fallback_active_category();
    }

    /// Render-ready snapshot.
    pub fn view(&self) -> BookmarkView {
        let mut tabs = vec![CategoryTab {
            label: ALL_CATEGORY.to_string(),
            count: self.bookmarks.len(),
        }];
        tabs.extend(self.groups.iter().map(|g| CategoryTab {
            label: g.label.clone(),
            count: g.bookmarks.len(),
        }));

        let groups = if self.active_category == ALL_CATEGORY {
            self.groups.clone()
        } else {
            self.groups
                .iter()
                .filter(|g| g.label == self.active_category)
                .cloned()
                .collect()
        };

        BookmarkView {
            owner_id: self.owner_id.clone(),
            total: self.bookmarks.len(),
            active_category: self.active_category.clone(),
            tabs,
            groups,
            is_refreshing: self.is_refreshing(),
            is_adding: self.is_adding(),
            is_deleting: self.is_deleting(),
            is_reordering: self.reordering,
            pending_delete: self.pending_delete.clone(),
            add_draft: self.add_draft.as_ref().map(|d| d.url.clone()),
            notice: self.notice.as_ref().map(|n| NoticeView {
                kind: n.kind,
                message: n.message.clone(),
            }),
        }
    }
}
