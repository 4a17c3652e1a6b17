use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle for one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Which player each joined connection speaks for, plus how many open
/// connections are bound to each player.
#[derive(Debug, Default)]
pub struct ConnectionIndex {
    bound: DashMap<ConnectionId, String>,
    live: DashMap<String, usize>,
}

impl ConnectionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to an identity, replacing any earlier binding.
    /// Returns the identity it was previously bound to.
    pub fn bind(&self, conn: ConnectionId, identity: &str) -> Option<String> {
        let previous = self.bound.insert(conn, identity.to_string());
        if previous.as_deref() != Some(identity) {
            *self.live.entry(identity.to_string()).or_insert(0) += 1;
            if let Some(prev) = &previous {
                self.release(prev);
            }
        }
        previous
    }

    pub fn lookup(&self, conn: ConnectionId) -> Option<String> {
        self.bound.get(&conn).map(|i| i.value().clone())
    }

    pub fn unbind(&self, conn: ConnectionId) -> Option<String> {
        let (_, identity) = self.bound.remove(&conn)?;
        self.release(&identity);
        Some(identity)
    }

    /// Whether any open connection is still bound to `identity`.
    pub fn is_connected(&self, identity: &str) -> bool {
        self.live.contains_key(identity)
    }

    fn release(&self, identity: &str) {
        if let Entry::Occupied(mut count) = self.live.entry(identity.to_string()) {
            *count.get_mut() -= 1;
            if *count.get() == 0 {
                count.remove();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}
