//! Datagram framing for the multicast bus.

use favletters_core::Message;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest datagram the bus will read.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Opaque token naming one bus instance, used to drop our own looped-back
/// datagrams. Distinct from the tab's peer id.
pub type Origin = String;

/// Generate a fresh origin token.
pub fn new_origin() -> Origin {
    hex::encode(rand::random::<[u8; 8]>())
}

/// One datagram on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Which bus instance sent it.
    pub origin: Origin,
    /// The tab message.
    pub message: Message,
}

impl Envelope {
    pub fn new(origin: Origin, message: Message) -> Self {
        Self { origin, message }
    }

    /// Encode to JSON bytes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Decode a received datagram.
///
/// Returns `None` for our own datagrams and for anything malformed; bad
/// input is untrusted and simply dropped.
pub fn decode_datagram(own_origin: &str, bytes: &[u8]) -> Option<Message> {
    match serde_json::from_slice::<Envelope>(bytes) {
        Ok(envelope) if envelope.origin == own_origin => None,
        Ok(envelope) => Some(envelope.message),
        Err(e) => {
            debug!(error = %e, len = bytes.len(), "dropping malformed datagram");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use favletters_core::PeerId;

    #[test]
    fn decode_skips_own_origin() {
        let envelope = Envelope::new("me".into(), Message::request_state(PeerId::new("a")));
        let bytes = envelope.to_bytes().unwrap();

        assert_eq!(decode_datagram("me", &bytes), None);
        assert_eq!(
            decode_datagram("other", &bytes),
            Some(Message::request_state(PeerId::new("a")))
        );
    }

    #[test]
    fn decode_drops_garbage() {
        assert_eq!(decode_datagram("me", b"\x00\x01garbage"), None);
        assert_eq!(decode_datagram("me", br#"{"origin":"x"}"#), None);
        assert_eq!(
            decode_datagram("me", br#"{"origin":"x","message":{"type":"heartbeat"}}"#),
            None
        );
    }

    #[test]
    fn decode_passes_unknown_kinds_through() {
        let bytes = br#"{"origin":"x","message":{"type":"shiny_new_kind","v":2}}"#;
        assert_eq!(decode_datagram("me", bytes), Some(Message::Unknown));
    }

    #[test]
    fn origins_are_unique() {
        assert_ne!(new_origin(), new_origin());
        assert_eq!(new_origin().len(), 16);
    }
}
