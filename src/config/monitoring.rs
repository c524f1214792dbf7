use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::Error;
use crate::Result;

/// Lowest port the scrape endpoint may bind without elevated privileges
const FIRST_UNPRIVILEGED_PORT: u16 = 1024;

/// Prometheus scrape endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    /// Serve `/metrics` next to the event stream
    #[serde(default)]
    pub prometheus_enabled: bool,

    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: false,
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    /// Checks the scrape port against the event-stream listener it runs beside
    pub fn validate(
        &self,
        listen_port: u16,
    ) -> Result<()> {
        if !self.prometheus_enabled {
            debug!(port = self.prometheus_port, "metrics endpoint disabled, port ignored");
            return Ok(());
        }

        match self.prometheus_port {
            0 => Err(Error::InvalidConfig(
                "monitoring.prometheus_port needs a fixed port".into(),
            )),
            port if port < FIRST_UNPRIVILEGED_PORT => Err(Error::InvalidConfig(format!(
                "monitoring.prometheus_port {port} is privileged"
            ))),
            port if port == listen_port => Err(Error::InvalidConfig(format!(
                "monitoring.prometheus_port {port} is already the event-stream listen port"
            ))),
            _ => Ok(()),
        }
    }
}

fn default_prometheus_port() -> u16 {
    9100
}
