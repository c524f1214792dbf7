use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;
use warp::http::Response;
use warp::hyper::Body;
use warp::Filter;
use warp::Rejection;

use crate::metrics;
use crate::EventStreamHandler;
use crate::GaugeSink;
use crate::MemoryRouteStore;
use crate::NullTokenValidator;
use crate::PrometheusGaugeSink;
use crate::Result;
use crate::RouteWatcher;
use crate::Settings;
use crate::StaticTokenValidator;
use crate::SystemError;
use crate::TokenValidator;

/// Collects the collaborators of the event-stream service.
///
/// Anything not supplied falls back to a default chosen from the settings.
pub struct ServerBuilder {
    settings: Settings,
    shutdown_signal: watch::Receiver<()>,
    store: Option<Arc<dyn RouteWatcher>>,
    token_validator: Option<Arc<dyn TokenValidator>>,
    gauge_sink: Option<Arc<dyn GaugeSink>>,
}

impl ServerBuilder {
    pub fn init(
        settings: Settings,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            settings,
            shutdown_signal,
            store: None,
            token_validator: None,
            gauge_sink: None,
        }
    }

    pub fn with_store(
        mut self,
        store: Arc<dyn RouteWatcher>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_token_validator(
        mut self,
        token_validator: Arc<dyn TokenValidator>,
    ) -> Self {
        self.token_validator = Some(token_validator);
        self
    }

    pub fn with_gauge_sink(
        mut self,
        gauge_sink: Arc<dyn GaugeSink>,
    ) -> Self {
        self.gauge_sink = Some(gauge_sink);
        self
    }

    pub fn build(self) -> Server {
        let Self {
            settings,
            shutdown_signal,
            store,
            token_validator,
            gauge_sink,
        } = self;

        let store = store.unwrap_or_else(|| {
            debug!("no store supplied, using in-memory route store");
            Arc::new(MemoryRouteStore::new(settings.stream.watcher_buffer_size))
        });

        let token_validator = token_validator.unwrap_or_else(|| {
            if settings.server.dev_mode {
                warn!("dev mode: event-stream requests are not authorized");
                Arc::new(NullTokenValidator)
            } else {
                Arc::new(StaticTokenValidator::new(&settings.auth.tokens))
            }
        });

        let gauge_sink = gauge_sink.unwrap_or_else(|| Arc::new(PrometheusGaugeSink));

        let handler = EventStreamHandler::new(
            token_validator,
            store,
            gauge_sink,
            shutdown_signal.clone(),
            &settings.stream,
        );

        Server {
            settings,
            handler,
            shutdown_signal,
        }
    }
}

/// A fully wired event-stream service, ready to bind
pub struct Server {
    settings: Settings,
    handler: EventStreamHandler,
    shutdown_signal: watch::Receiver<()>,
}

impl Server {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// All HTTP routes served by this process
    pub fn routes(&self) -> impl Filter<Extract = (Response<Body>,), Error = Rejection> + Clone {
        self.handler.clone().routes()
    }

    /// Spawns the Prometheus scrape endpoint when monitoring is enabled
    pub fn start_metrics_server(self) -> Self {
        if self.settings.monitoring.prometheus_enabled {
            let port = self.settings.monitoring.prometheus_port;
            let shutdown_signal = self.shutdown_signal.clone();
            info!(port, "starting metrics server");
            tokio::spawn(async move {
                metrics::start_server(port, shutdown_signal).await;
            });
        }
        self
    }

    /// Binds the configured listen address.
    ///
    /// Returns the bound address and a future that serves until the shutdown
    /// signal fires and every open stream has drained.
    pub fn bind(&self) -> Result<(SocketAddr, impl Future<Output = ()> + 'static)> {
        let mut shutdown_signal = self.shutdown_signal.clone();
        let listen_address = self.settings.server.listen_address;

        let (addr, serving) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(listen_address, async move {
                let _ = shutdown_signal.changed().await;
            })
            .map_err(|e| SystemError::ServerStartFailed(format!("{listen_address}: {e}")))?;

        Ok((addr, serving))
    }

    pub async fn run(self) -> Result<()> {
        let (addr, serving) = self.bind()?;
        info!(%addr, "event-stream server listening");
        serving.await;
        info!("event-stream server stopped");
        Ok(())
    }
}
