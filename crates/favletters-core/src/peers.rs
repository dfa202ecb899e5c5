//! Peer table and ranking.
//!
//! # Ranking Rule
//!
//! ```text
//! a precedes b  iff  a.priority <  b.priority
//!                or  a.priority == b.priority && a.created_at <  b.created_at
//!                or  both equal && a.id < b.id
//! ```
//!
//! The id comparison only matters when two tabs share priority and creation
//! millisecond. It keeps the order total, so two tabs holding the same table
//! always derive the same ranking regardless of map iteration order.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::identity::{PeerId, Priority};

/// What a tab knows about one peer (itself included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    /// When the peer was created (its own clock).
    pub created_at: Millis,

    /// When we last heard a heartbeat from it (our clock).
    pub last_seen: Millis,

    /// The peer's ranking override.
    pub priority: Priority,
}

impl PeerRecord {
    pub fn new(created_at: Millis, last_seen: Millis, priority: Priority) -> Self {
        Self {
            created_at,
            last_seen,
            priority,
        }
    }

    /// Whether ranking inputs differ (`last_seen` does not affect ranking).
    fn ranks_differently(&self, other: &PeerRecord) -> bool {
        self.created_at != other.created_at || self.priority != other.priority
    }
}

/// Compare two peers by the ranking rule.
pub fn rank_order(a: (&PeerId, &PeerRecord), b: (&PeerId, &PeerRecord)) -> Ordering {
    a.1.priority
        .cmp(&b.1.priority)
        .then(a.1.created_at.cmp(&b.1.created_at))
        .then_with(|| a.0.cmp(b.0))
}

/// Every peer this tab currently believes is alive.
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    peers: HashMap<PeerId, PeerRecord>,
}

impl PeerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Get a peer's record.
    pub fn get(&self, id: &PeerId) -> Option<&PeerRecord> {
        self.peers.get(id)
    }

    /// Check whether a peer is known.
    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Insert or replace a peer.
    /// Returns true if the peer is new or its ranking inputs changed.
    pub fn upsert(&mut self, id: PeerId, record: PeerRecord) -> bool {
        match self.peers.insert(id, record) {
            Some(previous) => previous.ranks_differently(&record),
            None => true,
        }
    }

    /// Remove every peer other than `keep` that has been silent for longer
    /// than `threshold`. Returns the evicted ids.
    pub fn evict_stale(&mut self, keep: &PeerId, now: Millis, threshold: Millis) -> Vec<PeerId> {
        let stale: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|(id, record)| *id != keep && now.saturating_sub(record.last_seen) > threshold)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            self.peers.remove(id);
        }
        stale
    }

    /// `min(0, lowest known priority)`.
    pub fn min_priority(&self) -> Priority {
        self.peers
            .values()
            .map(|record| record.priority)
            .fold(0, Priority::min)
    }

    /// Peer ids in rank order.
    pub fn ranking(&self) -> Vec<PeerId> {
        let mut entries: Vec<(&PeerId, &PeerRecord)> = self.peers.iter().collect();
        entries.sort_by(|a, b| rank_order(*a, *b));
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// 0-based rank of a peer.
    pub fn position(&self, id: &PeerId) -> Option<usize> {
        self.ranking().iter().position(|p| p == id)
    }

    /// Number of known peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Iterate over all peers (unordered).
    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &PeerRecord)> {
        self.peers.iter()
    }
}
