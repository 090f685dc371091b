//! Bookmark session for Kizuna.
//!
//! A session is one surface's view of one owner's archive. It owns a
//! [`BookmarkReconciler`] and is the only place that mutates it. Store calls run
//! in spawned tasks that report back through a completion channel, so realtime
//! events, sync signals and identity changes keep being applied while a write
//! is in flight.
//!
//! Hosts either call [`BookmarkSession::run`] with a command channel, or drive
//! the session by hand with [`BookmarkSession::handle_command`],
//! [`BookmarkSession::drain_pending`] and [`BookmarkSession::settle`].

use std::future::{pending, Future};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::managers::bookmark_mutations::{
    add_bookmark, delete_bookmark, normalize_bookmark_url, persist_category, persist_ranks,
};
use crate::managers::bookmark_store::{BookmarkStore, ChangeFeed, FeedItem};
use crate::managers::reconciler::{BookmarkReconciler, OptimisticChange};
use crate::services::category_classifier::normalize_category_label;
use crate::services::identity::IdentityProvider;
use crate::services::metadata_resolver::MetadataResolver;
use crate::services::sync_signal::{SyncBus, SyncSubscription};
use crate::types::bookmark::{AddBookmarkRequest, Bookmark};
use crate::types::change_event::ChangeEvent;
use crate::types::errors::StoreError;
use crate::types::notice::{self, NoticeKind};
use crate::types::settings::ArchiveSettings;
use crate::types::view::BookmarkView;

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Refresh,
    Add(AddBookmarkRequest),
    RequestDelete(String),
    ConfirmDelete,
    CancelDelete,
    Recategorize { id: String, category: String },
    Reorder { dragged_id: String, target_id: String },
    SelectCategory(String),
    DismissNotice,
}

/// Completion report from a spawned store task.
///
/// `epoch` identifies the owner the task was started for; reports from an
/// earlier owner are discarded.
#[derive(Debug)]
enum TaskOutcome {
    /// Rows from a refetch. Not terminal: `RefreshSettled` follows.
    Fetched {
        epoch: u64,
        seq: u64,
        result: Result<Vec<Bookmark>, StoreError>,
    },
    RefreshSettled { epoch: u64 },
    Added {
        epoch: u64,
        result: Result<Bookmark, StoreError>,
    },
    Deleted {
        epoch: u64,
        id: String,
        result: Result<(), StoreError>,
    },
    Recategorized {
        epoch: u64,
        id: String,
        result: Result<(), StoreError>,
    },
    Reordered {
        epoch: u64,
        result: Result<(), StoreError>,
    },
}

impl TaskOutcome {
    fn is_terminal(&self) -> bool {
        !matches!(self, TaskOutcome::Fetched { .. })
    }
}

pub struct BookmarkSession {
    store: Arc<dyn BookmarkStore>,
    resolver: Arc<dyn MetadataResolver>,
    sync_bus: Arc<dyn SyncBus>,
    settings: ArchiveSettings,
    state: BookmarkReconciler,
    feed: Option<ChangeFeed>,
    sync: SyncSubscription,
    owner_rx: watch::Receiver<Option<String>>,
    identity_closed: bool,
    outcome_tx: mpsc::UnboundedSender<TaskOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<TaskOutcome>,
    in_flight: usize,
    epoch: u64,
    fetch_seq: u64,
    applied_fetch_seq: u64,
    view_tx: watch::Sender<BookmarkView>,
}

impl BookmarkSession {
    /// Builds a session for whoever `identity` currently reports.
    ///
    /// Subscriptions are opened here, before the first refetch, so no change
    /// between the read and the subscribe can be missed.
    pub fn new(
        store: Arc<dyn BookmarkStore>,
        resolver: Arc<dyn MetadataResolver>,
        sync_bus: Arc<dyn SyncBus>,
        identity: Arc<dyn IdentityProvider>,
        settings: ArchiveSettings,
    ) -> Self {
        let mut owner_rx = identity.subscribe();
        let owner = owner_rx.borrow_and_update().clone();
        let state = BookmarkReconciler::new(owner.clone(), settings.sync.notice_ttl());
        let feed = owner.as_deref().map(|o| store.subscribe(o));
        let sync = sync_bus.subscribe();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(state.view());

        Self {
            store,
            resolver,
            sync_bus,
            settings,
            state,
            feed,
            sync,
            owner_rx,
            identity_closed: false,
            outcome_tx,
            outcome_rx,
            in_flight: 0,
            epoch: 0,
            fetch_seq: 0,
            applied_fetch_seq: 0,
            view_tx,
        }
    }

    /// Issues the initial refetch. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        self.refetch();
        self.publish();
    }

    pub fn state(&self) -> &BookmarkReconciler {
        &self.state
    }

    pub fn view(&self) -> BookmarkView {
        self.state.view()
    }

    /// Receives a new snapshot every time the view changes.
    pub fn view_updates(&self) -> watch::Receiver<BookmarkView> {
        self.view_tx.subscribe()
    }

    /// Number of store tasks that have not reported back yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn now() -> std::time::Instant {
        Instant::now().into_std()
    }

    fn publish(&self) {
        let view = self.state.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(task.await);
        });
    }

    fn owner(&self) -> Option<String> {
        self.state.owner_id().map(str::to_string)
    }

    // === Commands ===

    pub fn handle_command(&mut self, command: SessionCommand) {
        debug!(?command, "session command");
        match command {
            SessionCommand::Refresh => self.refetch(),
            SessionCommand::Add(request) => self.add(request),
            SessionCommand::RequestDelete(id) => {
                if !self.state.request_delete(&id) {
                    debug!(%id, "delete requested for unknown bookmark");
                }
            }
            SessionCommand::ConfirmDelete => self.confirm_delete(),
            SessionCommand::CancelDelete => self.state.cancel_delete(),
            SessionCommand::Recategorize { id, category } => self.recategorize(&id, &category),
            SessionCommand::Reorder {
                dragged_id,
                target_id,
            } => self.reorder(&dragged_id, &target_id),
            SessionCommand::SelectCategory(label) => self.state.select_category(&label),
            SessionCommand::DismissNotice => self.state.dismiss_notice(),
        }
        self.publish();
    }

    /// Reads the owner's rows again. The refreshing flag stays up for at
    /// least the configured minimum, measured from the start of the read.
    pub fn refetch(&mut self) {
        let Some(owner) = self.owner() else {
            return;
        };

        self.state.begin_refresh();
        self.in_flight += 1;
        self.fetch_seq += 1;

        let epoch = self.epoch;
        let seq = self.fetch_seq;
        let floor = self.settings.sync.min_refresh();
        let store = self.store.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = store.select_all(&owner).await;
            let _ = tx.send(TaskOutcome::Fetched { epoch, seq, result });
            tokio::time::sleep_until(started + floor).await;
            let _ = tx.send(TaskOutcome::RefreshSettled { epoch });
        });
    }

    fn add(&mut self, request: AddBookmarkRequest) {
        let Some(owner) = self.owner() else {
            return;
        };
        if self.state.is_adding() {
            debug!("add ignored, another add is in flight");
            return;
        }

        let url = match normalize_bookmark_url(&request.url, &self.settings.bookmarks.default_scheme) {
            Ok(url) => url,
            Err(e) => {
                debug!(input = %request.url, error = %e, "rejected bookmark input");
                self.state.notify(NoticeKind::Error, e.to_string(), Self::now());
                self.state.keep_draft(request);
                return;
            }
        };
        let category = request
            .category
            .as_deref()
            .and_then(|c| normalize_category_label(c, self.settings.bookmarks.category_max_chars));

        self.state.begin_add(request);
        let epoch = self.epoch;
        let store = self.store.clone();
        let resolver = self.resolver.clone();
        self.spawn(async move {
            let result = add_bookmark(store, resolver, owner, url, category).await;
            TaskOutcome::Added { epoch, result }
        });
    }

    fn confirm_delete(&mut self) {
        let Some(owner) = self.owner() else {
            return;
        };
        let Some(id) = self.state.take_pending_delete() else {
            return;
        };

        self.state.apply_optimistic(OptimisticChange::Remove(id.clone()));
        self.state.begin_delete();
        let epoch = self.epoch;
        let store = self.store.clone();
        self.spawn(async move {
            let result = delete_bookmark(store, owner, id.clone()).await;
            TaskOutcome::Deleted { epoch, id, result }
        });
    }

    fn recategorize(&mut self, id: &str, category: &str) {
        let Some(owner) = self.owner() else {
            return;
        };
        if self.state.get(id).is_none() {
            debug!(%id, "recategorize for unknown bookmark");
            return;
        }

        let label = normalize_category_label(category, self.settings.bookmarks.category_max_chars);
        self.state.apply_optimistic(OptimisticChange::SetCategory {
            id: id.to_string(),
            category: label.clone(),
        });

        let epoch = self.epoch;
        let id = id.to_string();
        let store = self.store.clone();
        self.spawn(async move {
            let result = persist_category(store, owner, id.clone(), label).await;
            TaskOutcome::Recategorized { epoch, id, result }
        });
    }

    fn reorder(&mut self, dragged_id: &str, target_id: &str) {
        let Some(owner) = self.owner() else {
            return;
        };
        if self.state.is_reordering() {
            debug!("drag ignored, rank batch in flight");
            return;
        }
        let Some(plan) = self.state.plan_swap(dragged_id, target_id) else {
            return;
        };

        self.state.apply_optimistic(OptimisticChange::SetRanks(plan.ranks));
        if plan.changed.is_empty() {
            return;
        }

        self.state.set_reordering(true);
        let epoch = self.epoch;
        let store = self.store.clone();
        self.spawn(async move {
            let result = persist_ranks(store, owner, plan.changed).await;
            TaskOutcome::Reordered { epoch, result }
        });
    }

    // === Inputs ===

    /// Applies one item from the realtime feed.
    pub fn handle_feed_item(&mut self, item: FeedItem) {
        match item {
            FeedItem::Payload(payload) => match ChangeEvent::parse(&payload) {
                Ok(event) => {
                    let id = event.id().to_string();
                    if let Err(e) = self.state.apply_realtime_event(event) {
                        debug!(%id, error = %e, "realtime event ignored");
                    }
                }
                Err(e) => warn!(error = %e, "dropping malformed realtime payload"),
            },
            FeedItem::Lagged(missed) => {
                warn!(missed, "realtime feed lagged, refetching");
                self.refetch();
            }
        }
        self.publish();
    }

    /// Another surface changed something.
    pub fn handle_sync_signal(&mut self) {
        debug!("sync signal received");
        self.refetch();
        self.publish();
    }

    /// Switches to a different owner, or to nobody.
    pub fn handle_owner_change(&mut self, owner: Option<String>) {
        if owner.as_deref() == self.state.owner_id() {
            return;
        }
        info!(owner = ?owner, "session owner changed");

        self.epoch += 1;
        self.state.reset(owner.clone());
        self.feed = owner.as_deref().map(|o| self.store.subscribe(o));
        self.refetch();
        self.publish();
    }

    // === Completions ===

    fn apply_outcome(&mut self, outcome: TaskOutcome) {
        if outcome.is_terminal() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        let current = self.epoch;
        let stale = match &outcome {
            TaskOutcome::Fetched { epoch, .. }
            | TaskOutcome::RefreshSettled { epoch }
            | TaskOutcome::Added { epoch, .. }
            | TaskOutcome::Deleted { epoch, .. }
            | TaskOutcome::Recategorized { epoch, .. }
            | TaskOutcome::Reordered { epoch, .. } => *epoch != current,
        };
        if stale {
            debug!("discarding completion for previous owner");
            return;
        }

        match outcome {
            TaskOutcome::Fetched { seq, result, .. } => match result {
                Ok(rows) if seq >= self.applied_fetch_seq => {
                    self.applied_fetch_seq = seq;
                    debug!(rows = rows.len(), "refetch applied");
                    self.state.replace_all(rows);
                }
                Ok(_) => debug!(seq, "stale refetch result skipped"),
                Err(e) => warn!(error = %e, "refetch failed, keeping last known rows"),
            },
            TaskOutcome::RefreshSettled { .. } => self.state.finish_refresh(),
            TaskOutcome::Added { result, .. } => match result {
                Ok(bookmark) => {
                    info!(id = %bookmark.id, "bookmark added");
                    self.state.finish_add(true);
                    self.state.apply_optimistic(OptimisticChange::Upsert(bookmark));
                    self.state.notify(NoticeKind::Success, notice::ADD_OK, Self::now());
                    self.sync_bus.broadcast();
                }
                Err(e) => {
                    warn!(error = %e, "add failed");
                    self.state.finish_add(false);
                    self.state.notify(NoticeKind::Error, notice::ADD_FAILED, Self::now());
                }
            },
            TaskOutcome::Deleted { id, result, .. } => {
                self.state.finish_delete();
                match result {
                    Ok(()) => {
                        info!(%id, "bookmark deleted");
                        self.state.notify(NoticeKind::Success, notice::DELETE_OK, Self::now());
                        self.sync_bus.broadcast();
                    }
                    Err(e) => {
                        warn!(%id, error = %e, "delete failed");
                        self.state.notify(NoticeKind::Error, notice::DELETE_FAILED, Self::now());
                        self.refetch();
                    }
                }
            }
            TaskOutcome::Recategorized { id, result, .. } => match result {
                Ok(()) => self.sync_bus.broadcast(),
                Err(e) => {
                    warn!(%id, error = %e, "recategorize failed");
                    self.state
                        .notify(NoticeKind::Error, notice::RECATEGORIZE_FAILED, Self::now());
                    self.refetch();
                }
            },
            TaskOutcome::Reordered { result, .. } => {
                self.state.set_reordering(false);
                match result {
                    Ok(()) => self.sync_bus.broadcast(),
                    Err(e) => {
                        warn!(error = %e, "reorder failed");
                        self.state
                            .notify(NoticeKind::Error, notice::REORDER_FAILED, Self::now());
                        self.refetch();
                    }
                }
            }
        }
        self.publish();
    }

    /// Drops the notice once its time is up.
    pub fn expire_notice(&mut self) {
        if self.state.expire_notice(Self::now()) {
            self.publish();
        }
    }

    /// Waits until every spawned store task has reported back.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.outcome_rx.recv().await {
                Some(outcome) => self.apply_outcome(outcome),
                None => break,
            }
        }
    }

    /// Applies everything that is already waiting on the input channels
    /// without blocking.
    pub fn drain_pending(&mut self) {
        if self.owner_rx.has_changed().unwrap_or(false) {
            let owner = self.owner_rx.borrow_and_update().clone();
            self.handle_owner_change(owner);
        }
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply_outcome(outcome);
        }
        while let Some(item) = self.feed.as_mut().and_then(ChangeFeed::try_next) {
            self.handle_feed_item(item);
        }
        let mut signalled = false;
        while self.sync.try_recv() {
            signalled = true;
        }
        if signalled {
            self.handle_sync_signal();
        }
        self.expire_notice();
    }

    /// Runs the session until the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        self.start();
        loop {
            let deadline = self.state.notice_deadline().map(Instant::from_std);
            // Identity changes are applied before queued commands.
            tokio::select! {
                biased;

                changed = self.owner_rx.changed(), if !self.identity_closed => match changed {
                    Ok(()) => {
                        let owner = self.owner_rx.borrow_and_update().clone();
                        self.handle_owner_change(owner);
                    }
                    Err(_) => self.identity_closed = true,
                },
                Some(outcome) = self.outcome_rx.recv() => self.apply_outcome(outcome),
                item = next_feed_item(&mut self.feed) => match item {
                    Some(item) => self.handle_feed_item(item),
                    None => {
                        warn!("realtime feed closed");
                        self.feed = None;
                    }
                },
                Some(()) = self.sync.recv() => self.handle_sync_signal(),
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                _ = sleep_until(deadline) => self.expire_notice(),
            }
        }
        debug!("session stopped");
    }
}

async fn next_feed_item(feed: &mut Option<ChangeFeed>) -> Option<FeedItem> {
    match feed {
        Some(feed) => feed.next().await,
        None => pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => pending().await,
    }
}
