//! Periodic leaderboard fan-out.
//!
//! Snapshots are serialized once per tick and offered to every open
//! connection with `try_send`. A connection whose queue is full misses this
//! tick; nothing is retried and no connection can stall the others.

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use quiz_core::protocol::ServerMessage;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub entries: usize,
    pub delivered: usize,
    /// Connections whose queue was full.
    pub dropped: usize,
    /// Connections already closing.
    pub closed: usize,
}

/// Send one snapshot to all connections. Returns `None` when there are no
/// players to rank.
pub fn broadcast_leaderboard(state: &AppState) -> Option<DeliveryReport> {
    if state.registry.is_empty() {
        return None;
    }

    let snapshot = state.registry.ranked_top(state.config.leaderboard.top_k);
    let entries = snapshot.len();
    let frame: Utf8Bytes = match serde_json::to_string(&ServerMessage::LeaderboardUpdate(snapshot)) {
        Ok(json) => json.into(),
        Err(e) => {
            error!(error = %e, "Failed to serialize leaderboard");
            return None;
        }
    };

    let mut report = DeliveryReport {
        entries,
        ..DeliveryReport::default()
    };
    for peer in state.peers.iter() {
        match peer.tx.try_send(frame.clone()) {
            Ok(()) => report.delivered += 1,
            Err(TrySendError::Full(_)) => report.dropped += 1,
            Err(TrySendError::Closed(_)) => report.closed += 1,
        }
    }
    Some(report)
}

/// Spawn the broadcast loop. Runs until aborted.
pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.leaderboard.broadcast_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if let Some(report) = broadcast_leaderboard(&state) {
                if report.dropped > 0 {
                    debug!(?report, "Leaderboard broadcast dropped for lagging connections");
                }
            }
        }
    })
}
