//! Relay configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RelayError;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Demo players inserted at startup.
    #[serde(default)]
    pub bots: Vec<BotSeed>,
}

impl Config {
    /// Load from `$QUIZ_RELAY_CONFIG`, else `config.toml` if present, else
    /// defaults. `$PORT` overrides the configured port.
    pub fn load() -> Result<Self, RelayError> {
        let mut config = match std::env::var_os("QUIZ_RELAY_CONFIG") {
            Some(path) => Self::from_path(Path::new(&path))?,
            None => {
                let path = Path::new("config.toml");
                if path.exists() {
                    Self::from_path(path)?
                } else {
                    info!("No config.toml found, using defaults");
                    Self::default()
                }
            }
        };

        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| RelayError::InvalidConfig(format!("PORT={} is not a port", port)))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, RelayError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RelayError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| RelayError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        let invalid = |msg: &str| -> Result<(), RelayError> {
            Err(RelayError::InvalidConfig(msg.to_string()))
        };

        if self.server.outbound_queue == 0 {
            return invalid("server.outbound_queue must be at least 1");
        }
        if self.server.rate_limit_per_sec == 0 {
            return invalid("server.rate_limit_per_sec must be at least 1");
        }
        if self.leaderboard.broadcast_interval_ms == 0 {
            return invalid("leaderboard.broadcast_interval_ms must be non-zero");
        }
        if self.leaderboard.top_k == 0 {
            return invalid("leaderboard.top_k must be at least 1");
        }
        if self.retention.sweep_interval_secs == 0 {
            return invalid("retention.sweep_interval_secs must be non-zero");
        }
        if self.bots.iter().any(|b| b.username.trim().is_empty()) {
            return invalid("bots need a username");
        }
        Ok(())
    }
}

/// Networking and per-connection limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum simultaneous WebSocket connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Snapshots buffered per connection before new ones are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Inbound frames accepted per connection per second.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_sec: u32,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_connections: default_max_connections(),
            outbound_queue: default_outbound_queue(),
            rate_limit_per_sec: default_rate_limit(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_connections() -> usize {
    10_000
}
fn default_outbound_queue() -> usize {
    8
}
fn default_rate_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaderboardConfig {
    /// Milliseconds between snapshot broadcasts.
    #[serde(default = "default_broadcast_interval")]
    pub broadcast_interval_ms: u64,
    /// Maximum entries per snapshot.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl LeaderboardConfig {
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: default_broadcast_interval(),
            top_k: default_top_k(),
        }
    }
}

fn default_broadcast_interval() -> u64 {
    5_000
}
fn default_top_k() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Seconds between eviction sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Seconds a disconnected player is kept before eviction.
    #[serde(default = "default_player_ttl")]
    pub player_ttl_secs: u64,
}

impl RetentionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn player_ttl(&self) -> Duration {
        Duration::from_secs(self.player_ttl_secs)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            player_ttl_secs: default_player_ttl(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    60
}
fn default_player_ttl() -> u64 {
    5 * 60 * 60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotSeed {
    pub username: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default = "default_bot_status")]
    pub status: String,
}

fn default_bot_status() -> String {
    "Thinking...".to_string()
}
