//! Error types specific to reader and tag transports

use thiserror::Error;

/// Transport error type
///
/// Raised by the reader/tag collaborators when the physical or driver level
/// exchange fails, as opposed to the card answering with a non-OK status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection error
    #[error("Failed to connect to device")]
    Connection,

    /// Transmission error
    #[error("Failed to transmit data")]
    Transmission,

    /// The tag left the field or the reader lost it
    #[error("Tag removed from the field")]
    TagRemoved,

    /// The reader or tag handle was already closed
    #[error("Handle already closed")]
    Closed,

    /// Device error
    #[error("Device error")]
    Device,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }
}
