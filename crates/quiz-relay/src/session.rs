use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use tokio::sync::mpsc;
use tracing::{debug, info};

use quiz_core::protocol::{parse_client_message, ClientMessage, JoinRequest, ProgressPatch};

use crate::connections::ConnectionId;
use crate::error::FrameRejected;
use crate::state::AppState;

/// Connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Open, no identity yet. Progress updates are dropped.
    Connected,
    /// Bound to a player; progress updates are applied.
    Joined,
    /// Terminal.
    Closed,
}

/// Protocol handler for one connection.
///
/// Only mutates the registry and connection index; snapshots are sent by
/// the broadcast task, never from here.
pub struct Session {
    state: Arc<AppState>,
    id: ConnectionId,
    phase: SessionState,
    /// Frames received in the current one-second window.
    message_count: u32,
    rate_limit_window: Instant,
}

impl Session {
    pub fn open(state: Arc<AppState>) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (id, rx) = state.open_peer();
        debug!(%id, "Connection opened");
        let session = Self {
            state,
            id,
            phase: SessionState::Connected,
            message_count: 0,
            rate_limit_window: Instant::now(),
        };
        (session, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn phase(&self) -> &SessionState {
        &self.phase
    }

    /// Rate-limit, parse and dispatch one inbound text frame.
    pub fn handle_frame(&mut self, text: &str, now: Instant) -> Result<(), FrameRejected> {
        if self.phase == SessionState::Closed {
            return Err(FrameRejected::Closed);
        }

        if now.saturating_duration_since(self.rate_limit_window) > Duration::from_secs(1) {
            self.rate_limit_window = now;
            self.message_count = 0;
        }
        self.message_count += 1;
        if self.message_count > self.state.config.server.rate_limit_per_sec {
            return Err(FrameRejected::RateLimited);
        }

        let msg = match parse_client_message(text) {
            Ok(msg) => msg,
            Err(e) => {
                if let Some(score) = rejected_score(text) {
                    debug!(id = %self.id, %score, "Progress update with invalid score dropped");
                }
                return Err(e.into());
            }
        };
        self.handle(msg, now);
        Ok(())
    }

    pub fn handle(&mut self, msg: ClientMessage, now: Instant) {
        match msg {
            ClientMessage::Join(join) => self.join(join, now),
            ClientMessage::UpdateProgress(patch) => self.update_progress(&patch),
        }
    }

    fn join(&mut self, join: JoinRequest, now: Instant) {
        if self.phase == SessionState::Closed {
            return;
        }
        let record = self
            .state
            .registry
            .upsert_on_join(&join.username, &join.avatar_url);
        let previous = self.state.connections.bind(self.id, &record.identity);
        if let Some(prev) = previous.filter(|p| *p != record.identity) {
            self.release(&prev, now);
        }
        self.phase = SessionState::Joined;
        info!(id = %self.id, player = %record.identity, score = record.score, "Player joined");
    }

    /// Mark `identity` stale once no open connection speaks for it.
    fn release(&self, identity: &str, now: Instant) {
        if self.state.connections.is_connected(identity) {
            return;
        }
        self.state.registry.mark_disconnected(identity, now);
        info!(id = %self.id, player = %identity, "Player disconnected");
    }

    fn update_progress(&mut self, patch: &ProgressPatch) {
        if self.phase != SessionState::Joined {
            debug!(id = %self.id, "Progress before join dropped");
            return;
        }
        let Some(identity) = self.state.connections.lookup(self.id) else {
            return;
        };
        if !self.state.registry.apply_progress(&identity, patch) {
            debug!(id = %self.id, player = %identity, "Progress for evicted player dropped");
        }
    }

    /// Forget the connection, marking the player stale if this was their
    /// last one. Idempotent.
    pub fn close(&mut self, now: Instant) {
        if self.phase == SessionState::Closed {
            return;
        }
        if let Some(identity) = self.state.connections.unbind(self.id) {
            self.release(&identity, now);
        }
        if let Some((_, peer)) = self.state.peers.remove(&self.id) {
            debug!(id = %self.id, open_for = ?peer.opened_at.elapsed(), "Connection closed");
        }
        self.phase = SessionState::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close(Instant::now());
    }
}

/// The raw `score` of an `update_progress` frame, if it has one.
fn rejected_score(text: &str) -> Option<serde_json::Value> {
    let frame: serde_json::Value = serde_json::from_str(text).ok()?;
    if frame.get("event")?.as_str()? != "update_progress" {
        return None;
    }
    frame.get("data")?.get("score").cloned()
}

/// Top-level WebSocket handler, spawned per connection.
pub async fn handle_socket(state: Arc<AppState>, mut socket: WebSocket) {
    let (mut session, mut rx) = Session::open(state);

    loop {
        tokio::select! {
            // Outbound: forward queued snapshots to the WebSocket.
            Some(frame) = rx.recv() => {
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            // Inbound: read from the WebSocket.
            maybe_msg = socket.recv() => {
                match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = session.handle_frame(text.as_str(), Instant::now()) {
                            debug!(id = %session.id(), error = %e, "Frame dropped");
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => continue,
                }
            }
        }
    }

    session.close(Instant::now());
}
