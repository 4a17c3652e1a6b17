use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::protocol::ProgressPatch;
use crate::rounds;

pub const STATUS_THINKING: &str = "Thinking...";
pub const STATUS_FINISHED: &str = "Finished";

/// Outcome of one submitted prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round_id: u32,
    pub user_prompt: String,
    pub generated_content: String,
    pub score: u32,
    pub reasoning: String,
}

/// A player's progression through the round catalogue.
///
/// This is what a client keeps locally; the relay only ever sees the
/// aggregate produced by [`GameState::progress_patch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub current_round_id: u32,
    pub completed_rounds: Vec<u32>,
    pub results: BTreeMap<u32, RoundResult>,
    pub total_score: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_round_id: rounds::all().first().map(|r| r.id).unwrap_or(1),
            completed_rounds: Vec::new(),
            results: BTreeMap::new(),
            total_score: 0,
        }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        rounds::all()
            .iter()
            .all(|r| self.completed_rounds.contains(&r.id))
    }

    pub fn current_round(&self) -> Option<&'static rounds::Round> {
        if self.is_finished() {
            None
        } else {
            rounds::find(self.current_round_id)
        }
    }

    /// Record a finished round. A second result for the same round replaces
    /// the first, so the total never counts a round twice.
    pub fn record_result(&mut self, result: RoundResult) {
        let round_id = result.round_id;
        self.results.insert(round_id, result);
        if !self.completed_rounds.contains(&round_id) {
            self.completed_rounds.push(round_id);
        }
        self.total_score = self.results.values().map(|r| r.score).sum();

        self.current_round_id = rounds::all()
            .iter()
            .map(|r| r.id)
            .find(|id| !self.completed_rounds.contains(id))
            .unwrap_or(round_id + 1);
    }

    /// "Round N" while playing, "Finished" once every round is done.
    pub fn status_label(&self) -> String {
        if self.is_finished() {
            STATUS_FINISHED.to_string()
        } else {
            format!("Round {}", self.current_round_id)
        }
    }

    /// Update to send when the player enters the current round.
    pub fn progress_patch(&self) -> ProgressPatch {
        ProgressPatch {
            score: Some(self.total_score),
            status: Some(self.status_label()),
        }
    }

    /// Update to send right after a round is scored: the new total, and
    /// either "Finished" or "Thinking..." while the player is between rounds.
    pub fn completion_patch(&self) -> ProgressPatch {
        let status = if self.is_finished() {
            STATUS_FINISHED
        } else {
            STATUS_THINKING
        };
        ProgressPatch {
            score: Some(self.total_score),
            status: Some(status.to_string()),
        }
    }
}
