use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use route_stream::EventStreamHandler;
use route_stream::GaugeSink;
use route_stream::RouteWatcher;
use route_stream::StaticTokenValidator;
use route_stream::StreamConfig;
use route_stream::TokenGrant;
use route_stream::WatchChannels;
use route_stream::WatchError;
use route_stream::WatchFeed;
use route_stream::ADMIN_ROUTE_SCOPE;
use tokio::sync::watch;
use tokio::time::timeout;
use warp::http::Response;
use warp::hyper::body::HttpBody;
use warp::hyper::Body;

pub const WAIT: Duration = Duration::from_secs(2);
pub const ADMIN_TOKEN: &str = "admin-token";

/// Records every gauge delta in arrival order
#[derive(Debug, Default)]
pub struct RecordingSink {
    deltas: Mutex<Vec<(&'static str, i64)>>,
}

impl RecordingSink {
    pub fn deltas(&self) -> Vec<(&'static str, i64)> {
        self.deltas.lock().clone()
    }

    pub fn total(&self) -> i64 {
        self.deltas.lock().iter().map(|(_, d)| d).sum()
    }
}

impl GaugeSink for RecordingSink {
    fn gauge_delta(
        &self,
        name: &'static str,
        delta: i64,
    ) {
        self.deltas.lock().push((name, delta));
    }
}

/// Hands out plain watch channels and keeps the store half for the test
#[derive(Debug, Default)]
pub struct ScriptedWatcher {
    opens: AtomicUsize,
    feeds: Mutex<Vec<WatchFeed>>,
}

impl ScriptedWatcher {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn take_feed(&self) -> WatchFeed {
        self.feeds.lock().pop().expect("a watch should have been opened")
    }
}

impl RouteWatcher for ScriptedWatcher {
    fn watch_route_changes(&self) -> Result<WatchChannels, WatchError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (channels, feed) = WatchChannels::pair(16);
        self.feeds.lock().push(feed);
        Ok(channels)
    }
}

pub fn admin_validator() -> Arc<StaticTokenValidator> {
    Arc::new(StaticTokenValidator::new(&[TokenGrant {
        token: ADMIN_TOKEN.into(),
        scopes: vec![ADMIN_ROUTE_SCOPE.into()],
    }]))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn handler(
    watcher: Arc<dyn RouteWatcher>,
    sink: Arc<RecordingSink>,
    shutdown_signal: watch::Receiver<()>,
) -> EventStreamHandler {
    EventStreamHandler::new(
        admin_validator(),
        watcher,
        sink,
        shutdown_signal,
        &StreamConfig::default(),
    )
}

/// Next body chunk, or `None` once the stream has ended
pub async fn next_chunk(response: &mut Response<Body>) -> Option<Bytes> {
    timeout(WAIT, response.body_mut().data())
        .await
        .expect("body should make progress")
        .map(|chunk| chunk.expect("body chunk"))
}

/// Polls until `check` holds, failing after [`WAIT`]
pub async fn eventually(check: impl Fn() -> bool) {
    timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition should hold eventually");
}
