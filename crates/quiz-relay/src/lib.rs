pub mod broadcast;
pub mod config;
pub mod connections;
pub mod error;
pub mod registry;
pub mod routes;
pub mod session;
pub mod state;
pub mod sweeper;

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::state::AppState;

/// Handles to the broadcast and eviction loops.
pub struct BackgroundTasks {
    broadcast: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl BackgroundTasks {
    pub fn spawn(state: &Arc<AppState>) -> Self {
        Self {
            broadcast: broadcast::spawn(state.clone()),
            sweeper: sweeper::spawn(state.clone()),
        }
    }

    pub fn shutdown(self) {
        self.broadcast.abort();
        self.sweeper.abort();
    }
}

/// Build a fully configured Router + shared state, and start the
/// background loops. Must be called inside a Tokio runtime.
pub fn build_app(config: Config) -> (Router, Arc<AppState>, BackgroundTasks) {
    let state = Arc::new(AppState::new(config));
    let tasks = BackgroundTasks::spawn(&state);

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/leaderboard", get(routes::leaderboard))
        .route("/ws", get(routes::ws_upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state, tasks)
}

/// Resolve when `signal` fires. If the signal handler could not be
/// installed, log it and never resolve, so the server keeps running.
pub async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
