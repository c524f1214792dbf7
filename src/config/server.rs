use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_address: SocketAddr,

    /// Directory for the rolling log file. Empty means stdout.
    #[serde(default)]
    pub log_dir: PathBuf,

    /// Accept every caller without checking tokens
    #[serde(default)]
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_addr(),
            log_dir: PathBuf::new(),
            dev_mode: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.port() == 0 {
            return Err(Error::InvalidConfig(
                "listen_address must use a fixed port".into(),
            ));
        }

        Ok(())
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}
