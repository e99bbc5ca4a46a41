//! Collaborator traits for readers and tags
//!
//! The session core never talks to hardware directly. A [`ReaderDriver`]
//! enumerates and opens readers, a [`Reader`] lists the tags in its field, and a
//! [`TagTransport`] carries DESFire commands to one tag, including the framing
//! and cryptography of the exchange.

pub mod error;

use std::fmt;

pub use error::TransportError;
use tracing::{debug, trace};

use crate::{Command, Response, TagType, Uid, VersionInfo};

/// Enumerates and opens NFC readers
pub trait ReaderDriver: fmt::Debug {
    /// Reader type opened by this driver
    type Reader: Reader;

    /// List the connection strings of all available readers
    fn list_devices(&self) -> Result<Vec<String>, TransportError>;

    /// Open a reader by connection string
    fn open(&self, device: &str) -> Result<Self::Reader, TransportError>;
}

/// An opened NFC reader
pub trait Reader: fmt::Debug {
    /// Tag transport type handed out by this reader
    type Tag: TagTransport;

    /// Connection string of the reader
    fn name(&self) -> &str;

    /// List all tags currently present in the field, of any type
    fn list_tags(&mut self) -> Result<Vec<Self::Tag>, TransportError>;

    /// Release the reader
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Transport for one physical tag
///
/// Implementations own the low-level DESFire framing, the authentication
/// handshake and secure messaging. The session core only sees commands and
/// responses.
pub trait TagTransport: Send + fmt::Debug {
    /// UID read when the tag was discovered
    fn uid(&self) -> &Uid;

    /// Chip family reported by the reader
    fn tag_type(&self) -> TagType;

    /// Open a card-level connection to the tag
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the card-level connection
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Check if the card-level connection is open
    fn is_connected(&self) -> bool;

    /// Read the GetVersion information of a connected tag
    fn get_version(&mut self) -> Result<VersionInfo, TransportError>;

    /// Execute a DESFire command on a connected tag
    fn transmit(&mut self, command: &Command<'_>) -> Result<Response, TransportError> {
        trace!(
            uid = %self.uid(),
            command = command.name(),
            ins = format_args!("{:#04x}", command.instruction()),
            "Transmitting command"
        );
        let result = self.do_transmit(command);
        match &result {
            Ok(response) => {
                trace!(status = %response.status(), "Received response");
            }
            Err(e) => {
                debug!(error = ?e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit
    /// This is the method that concrete implementations should override
    fn do_transmit(&mut self, command: &Command<'_>) -> Result<Response, TransportError>;
}
