use std::time::Instant;

use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::connections::{ConnectionId, ConnectionIndex};
use crate::registry::PlayerRegistry;

/// Outbound side of one open connection. Holds pre-serialized frames.
#[derive(Debug, Clone)]
pub struct Peer {
    pub tx: mpsc::Sender<Utf8Bytes>,
    pub opened_at: Instant,
}

/// Shared relay state. Built once at startup and handed to every
/// connection task and background task as `Arc<AppState>`.
pub struct AppState {
    pub config: Config,
    pub registry: PlayerRegistry,
    pub connections: ConnectionIndex,
    /// Every open connection, joined or not.
    pub peers: DashMap<ConnectionId, Peer>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = PlayerRegistry::new();
        for bot in &config.bots {
            if registry.seed_bot(&bot.username, &bot.avatar_url, bot.score, &bot.status) {
                info!(bot = %bot.username, "Seeded bot player");
            }
        }

        Self {
            config,
            registry,
            connections: ConnectionIndex::new(),
            peers: DashMap::new(),
        }
    }

    /// Register a new connection and return its outbound queue.
    pub fn open_peer(&self) -> (ConnectionId, mpsc::Receiver<Utf8Bytes>) {
        let id = ConnectionId::next();
        let (tx, rx) = mpsc::channel(self.config.server.outbound_queue);
        self.peers.insert(
            id,
            Peer {
                tx,
                opened_at: Instant::now(),
            },
        );
        (id, rx)
    }

    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }
}
