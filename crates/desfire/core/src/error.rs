//! Error types for DESFire session operations

use thiserror::Error;

use crate::{Aid, KeySlot, Status, TransportError, Uid};

/// Result type for DESFire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a card exchange failed
///
/// Attached as the source of every error raised after card I/O was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardFailure {
    /// The reader or tag transport failed before the card answered
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The card answered with a non-OK status
    #[error("Card returned status {0}")]
    Status(Status),

    /// The card answered OK but the payload could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(&'static str),
}

impl CardFailure {
    /// Status returned by the card, if it answered
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<Status> for CardFailure {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}

/// Error type for DESFire operations
///
/// Local precondition violations ([`Error::NotConnected`],
/// [`Error::NotAuthenticated`], [`Error::InvalidKeyLength`],
/// [`Error::InvalidApplicationId`]) are raised before any card I/O. Every other
/// variant carries the context needed to act on it and the underlying
/// [`CardFailure`] or [`TransportError`].
#[derive(Debug, Error)]
pub enum Error {
    /// No reader could be listed or opened, or the reader handle is closed
    #[error("NFC reader unavailable")]
    ReaderUnavailable(#[source] TransportError),

    /// The reader reports no tags at all in its field
    #[error("No tags found")]
    NoTagsFound,

    /// No DESFire tag with the requested UID is present
    #[error("Tag {0} not found")]
    TagNotFound(String),

    /// The tag is present but could not be identified
    #[error("Can't reach tag with uid {uid}")]
    TagUnreachable {
        /// UID of the tag
        uid: Uid,
        /// Underlying failure
        #[source]
        source: CardFailure,
    },

    /// The card-level connect handshake was rejected
    #[error("Can't connect to tag with uid {uid}")]
    ConnectFailed {
        /// UID of the tag
        uid: Uid,
        /// Underlying failure
        #[source]
        source: TransportError,
    },

    /// The session is closed
    #[error("No tag connected")]
    NotConnected,

    /// The operation requires an authenticated session
    #[error("Operation requires authentication")]
    NotAuthenticated,

    /// Mutual authentication failed
    #[error("Authentication with key slot {slot} failed")]
    AuthenticationFailed {
        /// Key slot used
        slot: KeySlot,
        /// Underlying failure
        #[source]
        source: CardFailure,
    },

    /// A key buffer has the wrong length for its variant
    #[error("Invalid key length {actual}{}", .expected.map(|len| format!(", expected {len}")).unwrap_or_default())]
    InvalidKeyLength {
        /// Required length, if a specific variant was requested
        expected: Option<usize>,
        /// Length provided
        actual: usize,
    },

    /// An application id does not fit in 24 bits
    #[error("Invalid application id {0:#x}")]
    InvalidApplicationId(u32),

    /// Reading the key settings failed
    #[error("Get key settings failed")]
    KeySettingsReadFailed(#[source] CardFailure),

    /// Changing the key settings failed
    #[error("Change key settings failed")]
    KeySettingsChangeFailed(#[source] CardFailure),

    /// Changing a key failed
    #[error("Change key failed for slot {slot}")]
    KeyChangeFailed {
        /// Key slot being changed
        slot: KeySlot,
        /// Underlying failure
        #[source]
        source: CardFailure,
    },

    /// Listing application ids failed
    #[error("Get application ids failed")]
    ApplicationListFailed(#[source] CardFailure),

    /// Creating an application failed
    #[error("Create application {aid} failed")]
    ApplicationCreateFailed {
        /// Application id
        aid: Aid,
        /// Underlying failure
        #[source]
        source: CardFailure,
    },

    /// Selecting an application failed
    #[error("Select application {aid} failed")]
    ApplicationSelectFailed {
        /// Application id
        aid: Aid,
        /// Underlying failure
        #[source]
        source: CardFailure,
    },

    /// Formatting the card failed
    #[error("Format PICC failed")]
    FormatFailed(#[source] CardFailure),
}

impl Error {
    /// Whether the error was detected locally, before any card I/O
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::NotAuthenticated
                | Self::InvalidKeyLength { .. }
                | Self::InvalidApplicationId(_)
        )
    }

    /// Card-side cause of the error, if card I/O was attempted
    pub const fn card_failure(&self) -> Option<&CardFailure> {
        match self {
            Self::TagUnreachable { source, .. }
            | Self::AuthenticationFailed { source, .. }
            | Self::KeyChangeFailed { source, .. }
            | Self::ApplicationCreateFailed { source, .. }
            | Self::ApplicationSelectFailed { source, .. }
            | Self::KeySettingsReadFailed(source)
            | Self::KeySettingsChangeFailed(source)
            | Self::ApplicationListFailed(source)
            | Self::FormatFailed(source) => Some(source),
            _ => None,
        }
    }

    /// Status returned by the card, if the card answered with a rejection
    pub const fn card_status(&self) -> Option<Status> {
        match self.card_failure() {
            Some(failure) => failure.status(),
            None => None,
        }
    }
}
