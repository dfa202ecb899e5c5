//! Tab identity.

use serde::{Deserialize, Serialize};

use crate::clock::Millis;

/// Ranking override. Lower sorts earlier; every tab starts at 0.
pub type Priority = i64;

/// Opaque tab identifier.
///
/// Generated locally from 128 random bits, so collisions between tabs are
/// negligible without any coordination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap an existing identifier (e.g. one read off the wire).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(hex::encode(rand::random::<[u8; 16]>()))
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let short: String = self.0.chars().take(8).collect();
        if short.len() < self.0.len() {
            write!(f, "{}...", short)
        } else {
            write!(f, "{}", short)
        }
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who this tab is. Fixed for the lifetime of the tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    id: PeerId,
    created_at: Millis,
}

impl LocalIdentity {
    /// Create an identity from known parts.
    pub fn new(id: PeerId, created_at: Millis) -> Self {
        Self { id, created_at }
    }

    /// Generate a fresh identity created at `now`.
    pub fn generate(now: Millis) -> Self {
        Self::new(PeerId::generate(), now)
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn created_at(&self) -> Millis {
        self.created_at
    }
}
