use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Messages sent from client to relay.
///
/// Frames are JSON objects of the form `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(JoinRequest),
    UpdateProgress(ProgressPatch),
}

/// Messages sent from relay to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Ranked, size-capped snapshot of all known players.
    LeaderboardUpdate(Vec<LeaderboardEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub username: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// Partial update of a player's public state. Absent fields keep their
/// previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ProgressPatch {
    pub fn is_empty(&self) -> bool {
        self.score.is_none() && self.status.is_none()
    }
}

/// One row of the leaderboard as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub avatar_url: String,
    pub score: u32,
    pub status: String,
    pub is_bot: bool,
    /// 1-based position, highest score first.
    pub rank: u32,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("join without a username")]
    EmptyIdentity,
}

/// Parse and validate one inbound text frame.
///
/// Scores must be non-negative integers that fit in a `u32`; anything else
/// rejects the whole frame.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let msg: ClientMessage = serde_json::from_str(text)?;
    if let ClientMessage::Join(join) = &msg {
        if join.username.trim().is_empty() {
            return Err(ProtocolError::EmptyIdentity);
        }
    }
    Ok(msg)
}
