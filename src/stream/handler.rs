use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use tracing::error;
use tracing::warn;
use warp::http::Response;
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::Filter;
use warp::Rejection;

use super::error_response;
use super::event_stream_response;
use super::unauthorized_response;
use super::Subscription;
use super::DB_COMMUNICATION_ERROR;
use crate::GaugeSink;
use crate::RouteWatcher;
use crate::StreamConfig;
use crate::SubscriptionGuard;
use crate::TokenValidator;
use crate::ADMIN_ROUTE_SCOPE;

/// Accepts streaming subscribers and spawns one [`Subscription`] task per connection
#[derive(Clone)]
pub struct EventStreamHandler {
    token_validator: Arc<dyn TokenValidator>,
    watcher: Arc<dyn RouteWatcher>,
    gauge_sink: Arc<dyn GaugeSink>,
    /// Process-wide stop notification, cloned into every subscription
    shutdown_signal: watch::Receiver<()>,
    body_buffer_size: usize,
}

impl EventStreamHandler {
    pub fn new(
        token_validator: Arc<dyn TokenValidator>,
        watcher: Arc<dyn RouteWatcher>,
        gauge_sink: Arc<dyn GaugeSink>,
        shutdown_signal: watch::Receiver<()>,
        stream_config: &StreamConfig,
    ) -> Self {
        Self {
            token_validator,
            watcher,
            gauge_sink,
            shutdown_signal,
            body_buffer_size: stream_config.body_buffer_size.max(1),
        }
    }

    /// `GET /routing/v1/events`
    pub fn routes(self) -> impl Filter<Extract = (Response<Body>,), Error = Rejection> + Clone {
        let handler = Arc::new(self);
        warp::path!("routing" / "v1" / "events")
            .and(warp::get())
            .and(warp::header::optional::<String>("authorization"))
            .map(move |authorization: Option<String>| {
                handler.event_stream(authorization.as_deref().unwrap_or_default())
            })
    }

    /// Authorizes the caller and, on success, opens the stream.
    ///
    /// On success the watch is opened and the subscription counted before the
    /// response head is returned, so the client sees the stream open before the
    /// first event. On failure nothing is opened and nothing is counted.
    pub fn event_stream(
        &self,
        authorization: &str,
    ) -> Response<Body> {
        if let Err(e) = self
            .token_validator
            .decode_token(authorization, ADMIN_ROUTE_SCOPE)
        {
            warn!(error = %e, "unauthorized event-stream request");
            return unauthorized_response(e.to_string());
        }

        let watch = match self.watcher.watch_route_changes() {
            Ok(watch) => watch,
            Err(e) => {
                error!(error = %e, "failed to open route watch");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    DB_COMMUNICATION_ERROR,
                    e.to_string(),
                );
            }
        };

        let account = SubscriptionGuard::acquire(self.gauge_sink.clone());
        let subscription = Subscription::new(watch, account);
        debug!(subscription_id = subscription.id(), "Subscription opened");

        let (body_tx, body_rx) = mpsc::channel(self.body_buffer_size);
        tokio::spawn(subscription.run(body_tx, self.shutdown_signal.clone()));

        event_stream_response(Body::wrap_stream(ReceiverStream::new(body_rx)))
    }
}
