use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use quiz_core::protocol::LeaderboardEntry;

use crate::session;
use crate::state::AppState;

// ── Health ──────────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ── Leaderboard ─────────────────────────────────────────────────────────

/// Current snapshot, same shape as the broadcast payload.
pub async fn leaderboard(State(state): State<Arc<AppState>>) -> Json<Vec<LeaderboardEntry>> {
    Json(state.registry.ranked_top(state.config.leaderboard.top_k))
}

// ── WebSocket ───────────────────────────────────────────────────────────

pub async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let current = state.connection_count();
    if current >= state.config.server.max_connections {
        warn!(current, "Connection limit reached, rejecting upgrade");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws.on_upgrade(move |socket| session::handle_socket(state, socket)))
}
