//! Error types for taskdeck-core

use thiserror::Error;

/// Result type alias using taskdeck-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in taskdeck-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A mutation arrived before the first snapshot was loaded
    #[error("Collection is not initialized: {0} rejected before the first snapshot")]
    NotInitialized(&'static str),

    /// An inbound event could not be applied as-is
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// The pre-snapshot queue is full
    #[error("Pending event queue is full ({0} events)")]
    PendingOverflow(usize),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error was caused by the shape of an inbound event, as
    /// opposed to the state of the collection it was applied to.
    #[must_use]
    pub const fn is_malformed_event(&self) -> bool {
        matches!(self, Self::MalformedEvent(_))
    }
}
