//! In-memory route table with watch support
//!
//! Mutations and their fan-out happen under the same lock, so every watcher
//! observes notifications in mutation order. Delivery never blocks the
//! writer: a watcher whose queue is full is told it lagged and is dropped,
//! rather than silently missing events.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::RawChangeNotification;
use super::RouteWatcher;
use super::StoreNode;
use super::WatchChannels;
use super::WatchFeed;
use crate::WatchError;

#[derive(Debug)]
struct Watcher {
    id: u64,
    feed: WatchFeed,
}

impl Watcher {
    /// False once the consumer released or dropped its side
    fn is_live(&mut self) -> bool {
        match self.feed.cancel.try_recv() {
            Ok(()) => {
                trace!(watcher_id = self.id, "Watcher released by consumer");
                false
            }
            Err(TryRecvError::Closed) => false,
            Err(TryRecvError::Empty) => !self.feed.events.is_closed(),
        }
    }

    fn deliver(
        &mut self,
        notification: &RawChangeNotification,
    ) -> bool {
        if !self.is_live() {
            return false;
        }

        match self.feed.events.try_send(notification.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(watcher_id = self.id, "Watcher queue full, dropping watcher");
                let _ = self.feed.errors.try_send(WatchError::Lagged {
                    watcher_id: self.id,
                });
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Debug)]
struct MemoryRouteStoreInner {
    /// Route records keyed by route key. The lock also serializes fan-out.
    routes: Mutex<BTreeMap<String, Bytes>>,

    watchers: DashMap<u64, Watcher>,

    next_id: AtomicU64,

    closed: AtomicBool,

    watcher_buffer_size: usize,
}

/// Watch-capable route store kept entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryRouteStore {
    inner: Arc<MemoryRouteStoreInner>,
}

impl MemoryRouteStore {
    pub fn new(watcher_buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(MemoryRouteStoreInner {
                routes: Mutex::new(BTreeMap::new()),
                watchers: DashMap::new(),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                watcher_buffer_size: watcher_buffer_size.max(1),
            }),
        }
    }

    /// Inserts or replaces a route, emitting Create or Update
    pub fn upsert(
        &self,
        key: impl Into<String>,
        value: impl Into<Bytes>,
    ) {
        let key = key.into();
        let value = value.into();

        let mut routes = self.inner.routes.lock();
        let node = StoreNode::new(key.clone(), value.clone());
        let notification = match routes.insert(key.clone(), value) {
            None => RawChangeNotification::create(node),
            Some(prev) => RawChangeNotification::update(node, Some(StoreNode::new(key, prev))),
        };
        self.dispatch(&notification);
    }

    /// Removes a route, emitting Delete. Returns the previous value.
    pub fn delete(
        &self,
        key: &str,
    ) -> Option<Bytes> {
        self.remove_with(key, RawChangeNotification::delete)
    }

    /// Removes a route whose lifetime ran out, emitting Expire
    pub fn expire(
        &self,
        key: &str,
    ) -> Option<Bytes> {
        self.remove_with(key, RawChangeNotification::expire)
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<Bytes> {
        self.inner.routes.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.routes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers a terminal error to every watcher and forgets them
    pub fn fail_watchers(
        &self,
        error: WatchError,
    ) {
        let _routes = self.inner.routes.lock();
        self.inner.watchers.retain(|id, watcher| {
            debug!(watcher_id = *id, %error, "Failing watcher");
            let _ = watcher.feed.errors.try_send(error.clone());
            false
        });
    }

    /// Stops accepting watchers and fails the live ones with [`WatchError::Closed`]
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.fail_watchers(WatchError::Closed);
    }

    /// Number of watchers still connected to a consumer
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.retain(|_, watcher| watcher.is_live());
        self.inner.watchers.len()
    }

    fn remove_with(
        &self,
        key: &str,
        notification: fn(StoreNode) -> RawChangeNotification,
    ) -> Option<Bytes> {
        let mut routes = self.inner.routes.lock();
        let prev = routes.remove(key)?;
        self.dispatch(&notification(StoreNode::new(key, prev.clone())));
        Some(prev)
    }

    /// Caller must hold the routes lock
    fn dispatch(
        &self,
        notification: &RawChangeNotification,
    ) {
        trace!(kind = ?notification.kind, watchers = self.inner.watchers.len(), "Dispatching change");
        self.inner
            .watchers
            .retain(|_, watcher| watcher.deliver(notification));
    }
}

impl Default for MemoryRouteStore {
    fn default() -> Self {
        Self::new(crate::StreamConfig::default().watcher_buffer_size)
    }
}

impl RouteWatcher for MemoryRouteStore {
    fn watch_route_changes(&self) -> Result<WatchChannels, WatchError> {
        // Registering under the routes lock keeps a watcher from seeing half of a fan-out
        let _routes = self.inner.routes.lock();
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(WatchError::Closed);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (channels, feed) = WatchChannels::pair(self.inner.watcher_buffer_size);
        self.inner.watchers.insert(id, Watcher { id, feed });
        debug!(watcher_id = id, "Watcher registered");

        Ok(channels)
    }
}
