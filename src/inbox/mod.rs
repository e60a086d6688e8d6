//! The capture repository.
//!
//! `CaptureInbox` is the single writer of the capture collection. Every
//! operation reads the stored collection, computes the new one, writes it
//! back and (for anything that can move the unreviewed count) broadcasts the
//! count to subscribers. No operation returns an error: read failures look
//! like an empty inbox, write failures are logged, and a failed `save` is
//! reported through `CaptureItem::sync_error`.

pub mod codec;
pub mod id;

use crate::config::Config;
use crate::model::{
    CaptureFilter, CaptureItem, CapturePatch, CaptureStatus, NewCapture, PromotionTarget,
};
use crate::notify::{self, CountCallback, NotificationHub, Subscription};
use crate::store::{FileStore, KvStore, StoreError};
use crate::triage::{self, TriageEvent};
use id::{Clock, SystemClock};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// Storage key holding the serialized collection.
pub const DEFAULT_STORE_KEY: &str = "spark_capture_inbox";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode inbox: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct CaptureInbox {
    store: Arc<dyn KvStore>,
    key: String,
    clock: Arc<dyn Clock>,
    hub: NotificationHub,
}

impl std::fmt::Debug for CaptureInbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureInbox")
            .field("key", &self.key)
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

impl CaptureInbox {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            key: DEFAULT_STORE_KEY.to_string(),
            clock: Arc::new(SystemClock),
            hub: NotificationHub::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// File-backed inbox under `app.data_dir`, using the configured key and quota.
    pub fn open(cfg: &Config) -> Result<Self, StoreError> {
        let mut store = FileStore::open(cfg.app.resolved_data_dir())?;
        if let Some(quota) = cfg.app.storage_quota_bytes {
            store = store.with_quota(quota);
        }
        Ok(Self::new(Arc::new(store)).with_key(cfg.app.store_key.clone()))
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    fn read(&self) -> Vec<CaptureItem> {
        match self.store.get(&self.key) {
            Ok(Some(raw)) => codec::decode(&raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(?err, key = %self.key, "failed to read inbox; treating as empty");
                Vec::new()
            }
        }
    }

    fn write(&self, items: &[CaptureItem]) -> Result<(), PersistError> {
        let encoded = codec::encode(items)?;
        self.store.set(&self.key, &encoded)?;
        Ok(())
    }

    fn notify(&self) {
        self.hub.broadcast(self.unreviewed_count());
    }

    // ------------------------------------------------------------------
    // reads
    // ------------------------------------------------------------------

    /// Items in stored order (newest capture first), optionally by status.
    pub fn get_all(&self, filter: CaptureFilter) -> Vec<CaptureItem> {
        let mut items = self.read();
        items.retain(|item| filter.matches(item));
        items
    }

    pub fn get(&self, id: &str) -> Option<CaptureItem> {
        self.read().into_iter().find(|item| item.id == id)
    }

    /// Badge count: how many items still await triage.
    pub fn unreviewed_count(&self) -> usize {
        self.read().iter().filter(|item| item.is_unreviewed()).count()
    }

    // ------------------------------------------------------------------
    // writes
    // ------------------------------------------------------------------

    /// Capture a new item at the front of the inbox.
    ///
    /// If the write fails the item is still returned, with `sync_error` set,
    /// but it is not in the stored collection and nobody is notified.
    #[instrument(skip_all, fields(source = input.source.as_str()))]
    pub fn save(&self, input: NewCapture) -> CaptureItem {
        let now = self.clock.now_ms();
        let item = CaptureItem {
            id: id::generate_id(now),
            source: input.source,
            status: CaptureStatus::Unreviewed,
            raw: input.raw,
            attachment_uri: input.attachment_uri,
            created_at: now,
            promoted_to: None,
            promoted_at: None,
            transcript: None,
            sync_error: None,
        };
        self.insert_front(item)
    }

    /// Persist an item previously returned by a failed [`save`](Self::save).
    ///
    /// Only items carrying `sync_error` are retried. Anything else is returned
    /// as given, so a deleted or purged item is never brought back. The retried
    /// item keeps its id, capture time and status, loses `sync_error` and goes
    /// to the front. If the id is already stored, the stored copy is returned
    /// and nothing is written.
    #[instrument(skip_all, fields(id = %item.id))]
    pub fn retry_save(&self, item: &CaptureItem) -> CaptureItem {
        if item.sync_error.is_none() {
            warn!("capture did not fail to save; refusing to retry");
            return item.clone();
        }
        if let Some(existing) = self.get(&item.id) {
            debug!("capture already stored; nothing to retry");
            return existing;
        }
        let mut fresh = item.clone();
        fresh.sync_error = None;
        self.insert_front(fresh)
    }

    fn insert_front(&self, mut item: CaptureItem) -> CaptureItem {
        let mut items = self.read();
        items.insert(0, item.clone());
        match self.write(&items) {
            Ok(()) => {
                debug!(id = %item.id, total = items.len(), "capture saved");
                self.notify();
            }
            Err(err) => {
                error!(?err, id = %item.id, "failed to persist capture");
                item.sync_error = Some(err.to_string());
            }
        }
        item
    }

    /// Shallow-merge `patch` into the item. Unknown ids are logged and ignored.
    #[instrument(skip_all, fields(id = %id))]
    pub fn update(&self, id: &str, patch: CapturePatch) {
        self.modify(id, "update", |item| {
            patch.apply_to(item);
            true
        });
    }

    #[instrument(skip_all, fields(id = %id, to = to.as_str()))]
    pub fn promote(&self, id: &str, to: PromotionTarget) {
        self.transition(id, TriageEvent::Promote(to));
    }

    /// Soft delete: the item stays stored with status `discarded`.
    #[instrument(skip_all, fields(id = %id))]
    pub fn discard(&self, id: &str) {
        self.transition(id, TriageEvent::Discard);
    }

    fn transition(&self, id: &str, event: TriageEvent) {
        let now = self.clock.now_ms();
        self.modify(id, "triage", |item| match triage::apply(item, event, now) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "triage rejected");
                false
            }
        });
    }

    /// Find `id`, let `f` change it, and persist if `f` says so.
    fn modify<F>(&self, id: &str, op: &'static str, f: F)
    where
        F: FnOnce(&mut CaptureItem) -> bool,
    {
        let mut items = self.read();
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            error!(op, "capture item not found");
            return;
        };
        if !f(item) {
            return;
        }
        match self.write(&items) {
            Ok(()) => {
                debug!(op, "capture updated");
                self.notify();
            }
            Err(err) => error!(?err, op, "failed to persist capture update"),
        }
    }

    /// Hard delete. Unknown ids are a no-op.
    #[instrument(skip_all, fields(id = %id))]
    pub fn delete(&self, id: &str) {
        let mut items = self.read();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            debug!("delete: no such capture");
            return;
        }
        match self.write(&items) {
            Ok(()) => {
                debug!("capture deleted");
                self.notify();
            }
            Err(err) => error!(?err, "failed to persist delete"),
        }
    }

    /// Purge every discarded item.
    ///
    /// Does not notify: discarded items never count as unreviewed, so the
    /// badge cannot change. Revisit if discarded items ever become reviewable.
    #[instrument(skip_all)]
    pub fn clear_discarded(&self) {
        let mut items = self.read();
        let before = items.len();
        items.retain(|item| item.status != CaptureStatus::Discarded);
        let removed = before - items.len();
        if removed == 0 {
            return;
        }
        match self.write(&items) {
            Ok(()) => debug!(removed, "discarded captures cleared"),
            Err(err) => error!(?err, "failed to persist discarded purge"),
        }
    }

    // ------------------------------------------------------------------
    // reactivity
    // ------------------------------------------------------------------

    /// Register `callback` for unreviewed-count changes and call it once
    /// right away with the current count.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(usize) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: CountCallback = Arc::new(callback);
        let subscription = self.hub.register(Arc::clone(&callback));
        notify::invoke(&callback, self.unreviewed_count());
        subscription
    }
}
