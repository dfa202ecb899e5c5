//! Error types for favletters-core.

use thiserror::Error;

/// Result type for favletters-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the engine and its seams.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport refused to publish or subscribe.
    #[error("transport error: {0}")]
    Transport(String),

    /// Durable storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// A message could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The other side of a channel has gone away.
    #[error("channel closed")]
    Closed,
}
