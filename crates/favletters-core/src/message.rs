//! Wire messages exchanged between tabs.
//!
//! Each message is a flat JSON object discriminated by `type`:
//!
//! ```text
//! {"type":"heartbeat","id":"…","createdAt":1700000000000,"priority":-1}
//! {"type":"text_update","text":"FAV","senderId":"…","timestamp":1700000000000}
//! {"type":"request_state","senderId":"…"}
//! ```
//!
//! Unknown `type` values decode to [`Message::Unknown`] and are ignored by
//! the engine. Missing required fields fail to decode and the message is
//! dropped by the transport.

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::error::Result;
use crate::identity::{PeerId, Priority};

/// A message on the broadcast bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Liveness plus ranking inputs.
    #[serde(rename_all = "camelCase")]
    Heartbeat {
        id: PeerId,
        created_at: Millis,
        /// Absent means 0. Older tabs send it as `customPriority`.
        #[serde(default, alias = "customPriority", skip_serializing_if = "Option::is_none")]
        priority: Option<Priority>,
    },

    /// The sender's current text.
    #[serde(rename_all = "camelCase")]
    TextUpdate {
        text: String,
        sender_id: PeerId,
        /// Carried for diagnostics only; never used for merging.
        #[serde(default)]
        timestamp: Millis,
    },

    /// Ask every peer to re-announce its text.
    #[serde(rename_all = "camelCase")]
    RequestState { sender_id: PeerId },

    /// Any kind this version does not understand.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Build a heartbeat.
    pub fn heartbeat(id: PeerId, created_at: Millis, priority: Priority) -> Self {
        Message::Heartbeat {
            id,
            created_at,
            priority: Some(priority),
        }
    }

    /// Build a text update.
    pub fn text_update(text: impl Into<String>, sender_id: PeerId, timestamp: Millis) -> Self {
        Message::TextUpdate {
            text: text.into(),
            sender_id,
            timestamp,
        }
    }

    /// Build a state request.
    pub fn request_state(sender_id: PeerId) -> Self {
        Message::RequestState { sender_id }
    }

    /// Wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Heartbeat { .. } => "heartbeat",
            Message::TextUpdate { .. } => "text_update",
            Message::RequestState { .. } => "request_state",
            Message::Unknown => "unknown",
        }
    }

    /// Encode to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
