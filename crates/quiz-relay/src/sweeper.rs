use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::info;

use crate::state::AppState;

/// Remove players disconnected for longer than the retention window.
pub fn sweep(state: &AppState, now: Instant) -> usize {
    let removed = state
        .registry
        .evict_older_than(now, state.config.retention.player_ttl());
    if removed > 0 {
        info!(
            removed,
            remaining = state.registry.len(),
            "Cleanup: removed inactive players from memory"
        );
    }
    removed
}

/// Spawn the eviction loop. Runs until aborted.
pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.retention.sweep_interval());
        loop {
            interval.tick().await;
            sweep(&state, Instant::now());
        }
    })
}
