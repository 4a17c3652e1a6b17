use std::path::PathBuf;

use thiserror::Error;

use quiz_core::protocol::ProtocolError;

/// Startup failures. Nothing after startup is fatal to the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why an inbound frame was dropped. Never reported to the sender.
#[derive(Debug, Error)]
pub enum FrameRejected {
    #[error("rate limited")]
    RateLimited,
    #[error("connection already closed")]
    Closed,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
