//! Session and authentication state machine for DESFire contactless cards
//!
//! This crate sits between an application and a DESFire tag transport. It
//! enumerates DESFire tags on a reader, opens a session to one of them and
//! tracks which application is selected and which key slot is authenticated.
//!
//! ## Overview
//!
//! - [`ReaderHandle`] owns an opened reader
//! - [`TagDirectory`] discovers DESFire tags and hands out [`TagHandle`]s
//! - [`CardSession`] drives one tag: authentication, application selection,
//!   key administration and the application directory
//! - [`KeyMaterial`] holds a validated DES or AES key
//!
//! Framing, the authentication handshake and secure messaging belong to the
//! [`TagTransport`] implementation; the session only issues [`Command`]s and
//! interprets [`Response`]s. Local preconditions (a closed session, a missing
//! authentication, a key of the wrong length) are rejected before any card I/O.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::Bytes;

mod applications;
pub mod command;
pub mod config;
pub mod directory;
pub mod error;
pub mod key;
mod keys;
pub mod reader;
pub mod response;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock;

pub use command::Command;
pub use config::{DirectoryConfig, EnumerationPolicy};
pub use directory::{Scan, SkippedTag, TagDirectory, TagHandle, TagIdentity};
pub use error::{CardFailure, Error, Result};
pub use key::{AES_KEY_LEN, DES_KEY_LEN, KeyMaterial, KeyVariant};
pub use reader::ReaderHandle;
pub use response::{Response, Status};
pub use session::{AuthState, CardSession};
pub use transport::{Reader, ReaderDriver, TagTransport, TransportError};
pub use types::{
    Aid, ChangeKeyAccess, Generation, KeySettings, KeySettingsInfo, KeySlot, PartVersion,
    TagType, Uid, VersionInfo,
};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{Error, Result};

    // Discovery
    pub use crate::{DirectoryConfig, EnumerationPolicy, ReaderHandle, TagDirectory, TagIdentity};

    // Session
    pub use crate::{AuthState, CardSession, KeyMaterial, KeyVariant};
    pub use crate::{Aid, KeySettings, KeySlot, Uid};

    // Transport layer
    pub use crate::{Command, Response, Status};
    pub use crate::{Reader, ReaderDriver, TagTransport, TransportError};
}
