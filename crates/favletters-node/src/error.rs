//! Error types for the FavLetters node.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a tab.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine or transport seam error
    #[error("Engine error: {0}")]
    Core(#[from] favletters_core::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// The engine task has stopped
    #[error("Engine task has stopped")]
    Stopped,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tempfile::PersistError> for Error {
    fn from(e: tempfile::PersistError) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<Error> for favletters_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Core(inner) => inner,
            other => favletters_core::Error::Storage(other.to_string()),
        }
    }
}
