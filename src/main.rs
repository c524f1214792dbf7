use std::path::Path;

use route_stream::Error;
use route_stream::Result;
use route_stream::ServerBuilder;
use route_stream::Settings;
use route_stream::SystemError;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

const LOG_FILE_NAME: &str = "route-stream.log";

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = Settings::load(None)?;
    settings.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.server.log_dir);

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    let server = ServerBuilder::init(settings, graceful_rx)
        .build()
        .start_metrics_server();

    info!("Application started. Waiting for CTRL+C signal...");
    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    if let Err(e) = server.run().await {
        error!("server stops: {:?}", e);
        return Err(e);
    }

    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(SystemError::from)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(SystemError::from)?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    info!("Shutdown server..");
    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::from(SystemError::SignalSenderClosed(format!(
            "Failed to send shutdown signal: {}",
            e
        )))
    })?;

    info!("Shutdown completed");
    Ok(())
}

/// Logs to `log_dir/route-stream.log`, or to stdout when no directory is set
fn init_observability(log_dir: &Path) -> WorkerGuard {
    let (non_blocking, guard) = if log_dir.as_os_str().is_empty() {
        tracing_appender::non_blocking(std::io::stdout())
    } else {
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, LOG_FILE_NAME))
    };

    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    guard
}
