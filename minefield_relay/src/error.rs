// Error types for starting and configuring the relay.
//
// Per-connection failures never surface here: a handler that hits a read
// error, EOF, or an undecodable record just closes its connection. Only
// startup problems are reported to the caller of `start_relay`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
