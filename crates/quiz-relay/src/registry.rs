//! Authoritative player state, keyed by username.
//!
//! Records outlive connections: a disconnected player keeps their score and
//! stays on the leaderboard until the sweeper evicts them. Only
//! [`PlayerRegistry::evict_older_than`] ever removes a record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use quiz_core::protocol::{LeaderboardEntry, ProgressPatch};

pub const STATUS_JUST_JOINED: &str = "Just Joined";

/// Liveness of a player record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Has an open connection.
    Active,
    /// Last connection closed at `since`.
    Stale { since: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub identity: String,
    pub avatar_url: String,
    pub score: u32,
    pub status: String,
    pub is_bot: bool,
    pub presence: Presence,
    /// Creation order. Breaks ties between equal scores.
    pub seq: u64,
}

impl PlayerRecord {
    pub fn is_active(&self) -> bool {
        self.presence == Presence::Active
    }

    fn into_entry(self, rank: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            username: self.identity,
            avatar_url: self.avatar_url,
            score: self.score,
            status: self.status,
            is_bot: self.is_bot,
            rank,
        }
    }
}

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: DashMap<String, PlayerRecord>,
    next_seq: AtomicU64,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, identity: &str) -> Option<PlayerRecord> {
        self.players.get(identity).map(|r| r.value().clone())
    }

    /// Create a fresh record, or revive an existing one. Revival marks the
    /// player active and refreshes a non-empty avatar; score and status are
    /// never touched.
    pub fn upsert_on_join(&self, identity: &str, avatar_url: &str) -> PlayerRecord {
        let mut record = self
            .players
            .entry(identity.to_string())
            .or_insert_with(|| PlayerRecord {
                identity: identity.to_string(),
                avatar_url: avatar_url.to_string(),
                score: 0,
                status: STATUS_JUST_JOINED.to_string(),
                is_bot: false,
                presence: Presence::Active,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            });

        record.presence = Presence::Active;
        if !avatar_url.is_empty() {
            record.avatar_url = avatar_url.to_string();
        }
        record.clone()
    }

    /// Merge the supplied fields. Unknown identities are ignored; returns
    /// whether a record was updated.
    pub fn apply_progress(&self, identity: &str, patch: &ProgressPatch) -> bool {
        let Some(mut record) = self.players.get_mut(identity) else {
            return false;
        };
        if let Some(score) = patch.score {
            record.score = score;
        }
        if let Some(status) = &patch.status {
            record.status = status.clone();
        }
        true
    }

    pub fn mark_disconnected(&self, identity: &str, now: Instant) -> bool {
        match self.players.get_mut(identity) {
            Some(mut record) => {
                record.presence = Presence::Stale { since: now };
                true
            }
            None => false,
        }
    }

    /// Remove stale records disconnected for longer than `ttl`. Active
    /// records are kept regardless of age.
    pub fn evict_older_than(&self, now: Instant, ttl: Duration) -> usize {
        let mut removed = 0;
        self.players.retain(|_, record| match record.presence {
            Presence::Stale { since } if now.saturating_duration_since(since) > ttl => {
                removed += 1;
                false
            }
            _ => true,
        });
        removed
    }

    /// All players by score descending, ranked from 1, truncated to `k`.
    pub fn ranked_top(&self, k: usize) -> Vec<LeaderboardEntry> {
        let mut records: Vec<PlayerRecord> =
            self.players.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| b.score.cmp(&a.score).then(a.seq.cmp(&b.seq)));

        records
            .into_iter()
            .take(k)
            .zip(1u32..)
            .map(|(record, rank)| record.into_entry(rank))
            .collect()
    }

    /// Insert a demo player that never connects. Returns false if the
    /// username is taken.
    pub fn seed_bot(&self, identity: &str, avatar_url: &str, score: u32, status: &str) -> bool {
        if self.players.contains_key(identity) {
            return false;
        }
        self.players.insert(
            identity.to_string(),
            PlayerRecord {
                identity: identity.to_string(),
                avatar_url: avatar_url.to_string(),
                score,
                status: status.to_string(),
                is_bot: true,
                presence: Presence::Active,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
        true
    }
}
