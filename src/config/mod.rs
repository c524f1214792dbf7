//! Configuration management for the route event-stream service.
//!
//! Provides layered configuration loading with priority (lowest first):
//! 1. Default values (hardcoded)
//! 2. `config/default` file (optional)
//! 3. Explicit config path, or `CONFIG_PATH` environment variable
//! 4. `config/local` overrides (optional)
//! 5. Environment variables prefixed with `ROUTING__` (highest priority)

mod auth;
mod monitoring;
mod server;
mod stream;
pub use auth::*;
pub use monitoring::*;
pub use server::*;
pub use stream::*;

#[cfg(test)]
mod config_test;

//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// HTTP listener and process settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Metrics and monitoring settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Per-subscription buffering
    #[serde(default)]
    pub stream: StreamConfig,
    /// Static token grants used outside dev mode
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Settings {
    /// Load configuration from multiple sources with priority ordering.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to a config file. When given it must exist; otherwise
    ///   `CONFIG_PATH` is consulted.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        // 1. Shared defaults
        config = config.add_source(File::with_name("config/default").required(false));

        // 2. Explicit file or environment-selected file
        if let Some(path) = config_path {
            config = config.add_source(File::with_name(path).required(true));
        } else if let Ok(path) = env::var("CONFIG_PATH") {
            config = config.add_source(File::with_name(&path).required(true));
        }

        // 3. Local overrides
        config = config.add_source(File::with_name("config/local").required(false));

        // 4. Environment variables (highest priority)
        config = config.add_source(
            Environment::with_prefix("ROUTING")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Validates every section
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.monitoring
            .validate(self.server.listen_address.port())?;
        self.stream.validate()?;
        self.auth.validate(self.server.dev_mode)?;
        Ok(())
    }
}
