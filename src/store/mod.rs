//! Store watch port
//!
//! A watch hands its consumer three one-directional channels:
//!
//! ```text
//!  store ── events ──▶ RawChangeNotification ─┐
//!  store ── errors ──▶ WatchError (at most 1) ├─▶ Subscription
//!  store ◀── cancel ── CancelHandle ──────────┘
//! ```
//!
//! The consumer half is [`WatchChannels`], the producer half is [`WatchFeed`].
//! Releasing the [`CancelHandle`] is the only way for the consumer to ask the
//! store to drop the watcher. Dropping the handle without releasing it is
//! also safe: the store sees the closed channel and prunes the watcher on its
//! own schedule.

mod memory;
pub use memory::*;


use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::WatchError;

/// Kind of mutation reported by the store driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Invalid,
    Create,
    Update,
    Delete,
    Expire,
    /// Driver reported a code outside the known set
    Unrecognized(u8),
}

impl ChangeKind {
    /// Maps a driver action code. Codes follow the driver's declaration order.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ChangeKind::Invalid,
            1 => ChangeKind::Create,
            2 => ChangeKind::Update,
            3 => ChangeKind::Delete,
            4 => ChangeKind::Expire,
            other => ChangeKind::Unrecognized(other),
        }
    }
}

/// A single key/value node as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNode {
    pub key: String,
    pub value: Bytes,
}

impl StoreNode {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One change notification as delivered by the store.
///
/// `node` is meaningful for Create/Update, `prev_node` for Delete/Expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChangeNotification {
    pub kind: ChangeKind,
    pub node: Option<StoreNode>,
    pub prev_node: Option<StoreNode>,
}

impl RawChangeNotification {
    pub fn create(node: StoreNode) -> Self {
        Self {
            kind: ChangeKind::Create,
            node: Some(node),
            prev_node: None,
        }
    }

    pub fn update(
        node: StoreNode,
        prev_node: Option<StoreNode>,
    ) -> Self {
        Self {
            kind: ChangeKind::Update,
            node: Some(node),
            prev_node,
        }
    }

    pub fn delete(prev_node: StoreNode) -> Self {
        Self {
            kind: ChangeKind::Delete,
            node: None,
            prev_node: Some(prev_node),
        }
    }

    pub fn expire(prev_node: StoreNode) -> Self {
        Self {
            kind: ChangeKind::Expire,
            node: None,
            prev_node: Some(prev_node),
        }
    }

    pub fn invalid() -> Self {
        Self {
            kind: ChangeKind::Invalid,
            node: None,
            prev_node: None,
        }
    }
}

/// Consumer side of the cancel channel
#[derive(Debug)]
pub struct CancelHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl CancelHandle {
    /// Asks the store to stop the watch.
    ///
    /// Returns `true` only for the call that actually delivered the request.
    /// Later calls, or a store that already went away, are no-ops.
    pub fn release(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.tx.is_none()
    }
}

/// Consumer half of an open watch
#[derive(Debug)]
pub struct WatchChannels {
    pub events: mpsc::Receiver<RawChangeNotification>,
    pub errors: mpsc::Receiver<WatchError>,
    pub cancel: CancelHandle,
}

/// Producer half of an open watch, held by the store
#[derive(Debug)]
pub struct WatchFeed {
    pub events: mpsc::Sender<RawChangeNotification>,
    pub errors: mpsc::Sender<WatchError>,
    pub cancel: oneshot::Receiver<()>,
}

impl WatchChannels {
    /// Creates both halves of a watch. `buffer` bounds the notification queue.
    pub fn pair(buffer: usize) -> (WatchChannels, WatchFeed) {
        let (events_tx, events_rx) = mpsc::channel(buffer);
        // A single terminal error fits without blocking the store
        let (errors_tx, errors_rx) = mpsc::channel(1);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        (
            WatchChannels {
                events: events_rx,
                errors: errors_rx,
                cancel: CancelHandle { tx: Some(cancel_tx) },
            },
            WatchFeed {
                events: events_tx,
                errors: errors_tx,
                cancel: cancel_rx,
            },
        )
    }
}

#[cfg_attr(test, automock)]
pub trait RouteWatcher: Send + Sync + 'static {
    /// Opens a watch over every route record change.
    fn watch_route_changes(&self) -> Result<WatchChannels, WatchError>;
}
