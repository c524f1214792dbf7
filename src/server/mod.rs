//! Assembles the HTTP service from settings and collaborators.
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! ServerBuilder::init(settings, shutdown_rx)
//!     .with_store(store)            // optional override
//!     .build()
//!     .start_metrics_server()
//!     .run()
//!     .await?;
//! ```

mod builder;
pub use builder::*;
