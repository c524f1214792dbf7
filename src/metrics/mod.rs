//! Subscription accounting and the Prometheus scrape endpoint.
//!
//! Every subscription that reaches the streaming state holds a
//! [`SubscriptionGuard`]. Acquiring it sends `+1` to the gauge sink and
//! dropping it sends `-1`, so the pair fires exactly once however the
//! subscription ends.

#[cfg(test)]
mod metrics_test;

use std::sync::Arc;

use lazy_static::lazy_static;
#[cfg(test)]
use mockall::automock;
use prometheus::Encoder;
use prometheus::IntGauge;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing::warn;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

/// Gauge tracking open event-stream subscriptions
pub const TOTAL_SUBSCRIPTIONS_METRIC: &str = "total_subscriptions";

lazy_static! {
    pub static ref TOTAL_SUBSCRIPTIONS: IntGauge = IntGauge::new(
        TOTAL_SUBSCRIPTIONS_METRIC,
        "Number of currently open route event-stream subscriptions"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    if let Err(e) = registry.register(Box::new(TOTAL_SUBSCRIPTIONS.clone())) {
        warn!("collector {} not registered: {}", TOTAL_SUBSCRIPTIONS_METRIC, e);
    }
}

/// Gauge-style metrics sink. Delivery is best-effort and never fails the caller.
#[cfg_attr(test, automock)]
pub trait GaugeSink: Send + Sync + 'static {
    fn gauge_delta(
        &self,
        name: &'static str,
        delta: i64,
    );
}

/// Applies gauge deltas to the process-wide Prometheus gauges
#[derive(Debug, Default, Clone)]
pub struct PrometheusGaugeSink;

impl GaugeSink for PrometheusGaugeSink {
    fn gauge_delta(
        &self,
        name: &'static str,
        delta: i64,
    ) {
        match name {
            TOTAL_SUBSCRIPTIONS_METRIC => TOTAL_SUBSCRIPTIONS.add(delta),
            other => warn!(metric = other, delta, "Dropping delta for unknown gauge"),
        }
    }
}

/// Holds one unit of the live-subscription count
pub struct SubscriptionGuard {
    sink: Arc<dyn GaugeSink>,
}

impl SubscriptionGuard {
    pub fn acquire(sink: Arc<dyn GaugeSink>) -> Self {
        sink.gauge_delta(TOTAL_SUBSCRIPTIONS_METRIC, 1);
        Self { sink }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.sink.gauge_delta(TOTAL_SUBSCRIPTIONS_METRIC, -1);
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard").finish_non_exhaustive()
    }
}

pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);

    let registry = REGISTRY.clone();
    let metrics_route = warp::path!("metrics")
        .map(move || registry.clone())
        .and_then(metrics_handler);

    let bound = warp::serve(metrics_route).try_bind_with_graceful_shutdown(
        ([0, 0, 0, 0], port),
        async move {
            let _ = shutdown_signal.changed().await;
        },
    );
    match bound {
        Ok((addr, server)) => {
            info!(%addr, "metrics server listening");
            server.await;
        }
        Err(e) => error!(port, error = %e, "metrics server failed to bind"),
    }
}

async fn metrics_handler(registry: Registry) -> Result<impl Reply, Rejection> {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    let res = match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    };

    Ok(res)
}
