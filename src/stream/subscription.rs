use std::convert::Infallible;

use bytes::Bytes;
use nanoid::nanoid;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::translate;
use super::WireEvent;
use crate::RawChangeNotification;
use crate::SubscriptionGuard;
use crate::WatchChannels;

/// Writer side of the HTTP response body. Each message is one flushed chunk.
pub type BodySender = mpsc::Sender<Result<Bytes, Infallible>>;

/// Why a subscription stopped streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTermination {
    /// Notification could not be translated, or the notification channel ended
    TranslationFailed,
    /// Store reported a terminal watch error
    StoreErrored,
    /// Service is shutting down; the watch was released
    ExternallyStopped,
    /// Client went away, or writing to it failed
    ClientDisconnected,
}

/// One accepted streaming connection.
///
/// Owns the open watch, the event sequence and one unit of the live
/// subscription count. Dropping it releases all three.
#[derive(Debug)]
pub struct Subscription {
    id: String,
    watch: WatchChannels,
    next_event_id: u64,
    _account: SubscriptionGuard,
}

impl Subscription {
    pub fn new(
        watch: WatchChannels,
        account: SubscriptionGuard,
    ) -> Self {
        Self {
            id: nanoid!(),
            watch,
            next_event_id: 0,
            _account: account,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Streams events to `body` until one of the four termination sources fires.
    ///
    /// The select below is the only await point: a translated event waits in
    /// `pending` until the body has room, and no notification is read while
    /// it waits. A client that stops reading therefore still observes
    /// shutdown, store errors and disconnects.
    ///
    /// Only the shutdown path writes to the watch's cancel channel. A store
    /// error means the watch is already dead, and a gone client leaves the
    /// watch to be reclaimed when the subscription drops.
    pub async fn run(
        mut self,
        body: BodySender,
        mut shutdown_signal: watch::Receiver<()>,
    ) -> StreamTermination {
        let mut pending: Option<WireEvent> = None;

        let termination = loop {
            tokio::select! {
                // Terminal sources first; notifications can never starve them
                // because each of them fires at most once.
                biased;

                Some(e) = self.watch.errors.recv() => {
                    error!(subscription_id = %self.id, error = %e, "watch-error");
                    break StreamTermination::StoreErrored;
                }

                _ = shutdown_signal.changed() => {
                    info!(subscription_id = %self.id, "event-stream-stopped");
                    if !self.watch.cancel.release() {
                        debug!(subscription_id = %self.id, "store already dropped the watch");
                    }
                    break StreamTermination::ExternallyStopped;
                }

                _ = body.closed() => {
                    info!(subscription_id = %self.id, "connection-closed");
                    break StreamTermination::ClientDisconnected;
                }

                permit = body.reserve(), if pending.is_some() => {
                    let Ok(permit) = permit else {
                        info!(subscription_id = %self.id, "connection-closed during write");
                        break StreamTermination::ClientDisconnected;
                    };
                    if let Some(event) = pending.take() {
                        trace!(
                            subscription_id = %self.id,
                            event_id = event.id,
                            name = %event.name,
                            "Forwarding event"
                        );
                        permit.send(Ok(event.encode()));
                        self.next_event_id += 1;
                    }
                }

                notification = self.watch.events.recv(), if pending.is_none() => {
                    match self.next_event(notification) {
                        Ok(event) => pending = Some(event),
                        Err(termination) => break termination,
                    }
                }
            }
        };

        info!(
            subscription_id = %self.id,
            reason = ?termination,
            events_sent = self.next_event_id,
            "Subscription ended"
        );
        termination
    }

    fn next_event(
        &self,
        notification: Option<RawChangeNotification>,
    ) -> Result<WireEvent, StreamTermination> {
        // A closed notification channel reads as an invalid notification
        let Some(notification) = notification else {
            debug!(subscription_id = %self.id, "watch notification channel closed");
            return Err(StreamTermination::TranslationFailed);
        };

        translate(notification, self.next_event_id).map_err(|e| {
            debug!(subscription_id = %self.id, error = %e, "dropping untranslatable notification");
            StreamTermination::TranslationFailed
        })
    }
}
