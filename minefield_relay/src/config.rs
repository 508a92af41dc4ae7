// Relay configuration.
//
// `RelayConfig` has sensible defaults for every field, so embedding code and
// tests can override just what they need with struct-update syntax. The
// standalone binary can also load it from a JSON file; missing fields fall
// back to the defaults.

use std::path::Path;
use std::time::Duration;

use minefield_protocol::MAX_BATCH_RECORDS;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Interface to listen on.
    pub bind_address: String,
    /// Listen port. 0 lets the OS pick a free port.
    pub port: u16,
    /// Maximum number of simultaneously registered peers.
    pub max_clients: usize,
    /// Upper bound on how long the seed monitor sleeps between checks.
    pub monitor_interval_ms: u64,
    /// Lines kept by the event log display.
    pub event_log_capacity: usize,
    /// Request a new board seed whenever a peer is admitted.
    pub reseed_on_join: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 12345,
            max_clients: 100,
            monitor_interval_ms: 50,
            event_log_capacity: 64,
            reseed_on_join: false,
        }
    }
}

impl RelayConfig {
    /// Load a config from a JSON file. Fields absent from the file keep their
    /// default values.
    pub fn from_json_file(path: &Path) -> Result<Self, RelayError> {
        let text = std::fs::read_to_string(path).map_err(|source| RelayError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| RelayError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.max_clients == 0 {
            return Err(RelayError::InvalidConfig(
                "max_clients must be at least 1".into(),
            ));
        }
        if self.max_clients > MAX_BATCH_RECORDS {
            return Err(RelayError::InvalidConfig(format!(
                "max_clients {} exceeds the largest reply batch ({MAX_BATCH_RECORDS})",
                self.max_clients
            )));
        }
        if self.monitor_interval_ms == 0 {
            return Err(RelayError::InvalidConfig(
                "monitor_interval_ms must be positive".into(),
            ));
        }
        if self.event_log_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "event_log_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}
