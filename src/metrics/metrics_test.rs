use std::sync::Arc;

use serial_test::serial;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_test::traced_test;

use super::*;
use crate::test_utils::accounted_sink;
use crate::test_utils::WAIT;

fn create_test_registry() -> Registry {
    let registry = Registry::new_custom(Some("routing".to_string()), None).unwrap();
    register_custom_metrics(&registry);
    registry
}

#[test]
fn test_custom_registry() {
    let registry = create_test_registry();

    let metrics = &registry.gather();
    let metric_names: Vec<_> = metrics.iter().map(|m| m.get_name()).collect();
    assert!(
        metric_names.contains(&"routing_total_subscriptions"),
        "Missing routing_total_subscriptions"
    );
}

#[test]
fn guard_increments_then_decrements_exactly_once() {
    let guard = SubscriptionGuard::acquire(Arc::new(accounted_sink()));
    drop(guard);
}

#[test]
fn guard_decrements_on_panic_unwind() {
    let sink: Arc<dyn GaugeSink> = Arc::new(accounted_sink());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = SubscriptionGuard::acquire(sink.clone());
        panic!("subscription task blew up");
    }));
    assert!(result.is_err());
}

#[test]
#[serial]
fn prometheus_sink_applies_deltas_concurrently() {
    let sink = PrometheusGaugeSink;
    let before = TOTAL_SUBSCRIPTIONS.get();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let guard = SubscriptionGuard::acquire(Arc::new(PrometheusGaugeSink));
                    drop(guard);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    sink.gauge_delta(TOTAL_SUBSCRIPTIONS_METRIC, 3);
    assert_eq!(TOTAL_SUBSCRIPTIONS.get(), before + 3);
    sink.gauge_delta(TOTAL_SUBSCRIPTIONS_METRIC, -3);
    assert_eq!(TOTAL_SUBSCRIPTIONS.get(), before);
}

#[test]
#[serial]
fn prometheus_sink_ignores_unknown_gauge() {
    let before = TOTAL_SUBSCRIPTIONS.get();
    PrometheusGaugeSink.gauge_delta("unknown_gauge", 5);
    assert_eq!(TOTAL_SUBSCRIPTIONS.get(), before);
}

#[tokio::test]
async fn test_metrics_endpoint_format() {
    let registry = create_test_registry();
    let metrics_route = warp::path!("metrics")
        .map(move || registry.clone())
        .and_then(metrics_handler);

    let response = warp::test::request()
        .method("GET")
        .path("/metrics")
        .reply(&metrics_route)
        .await;

    assert_eq!(response.status(), 200);
    let body = String::from_utf8(response.body().to_vec()).unwrap();
    assert!(body.contains("routing_total_subscriptions"));
}

#[tokio::test]
#[traced_test]
async fn metrics_server_reports_taken_port_instead_of_panicking() {
    let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let (_shutdown_tx, shutdown_rx) = watch::channel(());

    timeout(WAIT, start_server(port, shutdown_rx))
        .await
        .expect("bind failure should return immediately");

    assert!(logs_contain("metrics server failed to bind"));
}
