use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Buffering between the store, the subscription task and the HTTP body
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StreamConfig {
    /// Encoded events queued for the HTTP body before writes start waiting
    #[serde(default = "default_body_buffer_size")]
    pub body_buffer_size: usize,

    /// Raw notifications queued per watcher before the store drops it as lagged
    #[serde(default = "default_watcher_buffer_size")]
    pub watcher_buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            body_buffer_size: default_body_buffer_size(),
            watcher_buffer_size: default_watcher_buffer_size(),
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.body_buffer_size == 0 {
            return Err(Error::InvalidConfig("body_buffer_size must be > 0".into()));
        }
        if self.watcher_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "watcher_buffer_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_body_buffer_size() -> usize {
    64
}

fn default_watcher_buffer_size() -> usize {
    1024
}
