//! Card session state machine
//!
//! A session owns one claimed tag. It tracks the selected application and the
//! key slot the session is authenticated with, and enforces the local
//! preconditions of every operation before any card I/O happens.

use std::marker::PhantomData;

use bytes::Bytes;
use tracing::{debug, instrument, warn};

use crate::directory::{TagDirectory, TagHandle, TagIdentity};
use crate::reader::ReaderHandle;
use crate::transport::{Reader, TagTransport, TransportError};
use crate::{Aid, CardFailure, Command, Error, KeyMaterial, KeySlot, KeyVariant, Result, Uid};

/// Authentication state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No key slot is authenticated
    #[default]
    Unauthenticated,
    /// Authenticated with the given key slot of the selected application
    Authenticated(KeySlot),
}

/// An open connection to one DESFire tag
///
/// Operations take `&mut self`: a session is driven by one caller at a time.
/// The tag is disconnected by [`CardSession::close`] or when the session is
/// dropped, whichever comes first.
///
/// A session borrows the reader its tag was found on until it is dropped. The
/// reader cannot be enumerated again or closed underneath a live session.
#[derive(Debug)]
pub struct CardSession<'r, T: TagTransport> {
    tag: Option<T>,
    identity: TagIdentity,
    selected: Aid,
    auth: AuthState,
    reader: PhantomData<&'r mut ()>,
}

impl<'r, T: TagTransport> CardSession<'r, T> {
    /// Open a card-level connection to a claimed tag
    ///
    /// The root (card-level) application is selected initially.
    #[instrument(skip_all, fields(uid = %handle.uid()))]
    pub fn open(handle: TagHandle<'r, T>) -> Result<Self> {
        let (mut tag, identity) = handle.into_parts();

        tag.connect().map_err(|source| Error::ConnectFailed {
            uid: identity.uid().clone(),
            source,
        })?;
        debug!("Session opened");

        Ok(Self {
            tag: Some(tag),
            identity,
            selected: Aid::MASTER,
            auth: AuthState::Unauthenticated,
            reader: PhantomData,
        })
    }

    /// Find a tag by UID and open a session to it
    pub fn open_by_uid<R>(
        directory: &TagDirectory,
        reader: &'r mut ReaderHandle<R>,
        uid: &str,
    ) -> Result<Self>
    where
        R: Reader<Tag = T>,
    {
        let handle = directory.find_by_uid(reader, uid)?;
        Self::open(handle)
    }

    /// Identity of the tag, as read during discovery
    pub const fn identity(&self) -> &TagIdentity {
        &self.identity
    }

    /// Tag UID
    pub const fn uid(&self) -> &Uid {
        self.identity.uid()
    }

    /// Currently selected application
    pub const fn selected_application(&self) -> Aid {
        self.selected
    }

    /// Current authentication state
    pub const fn auth_state(&self) -> AuthState {
        self.auth
    }

    /// Key slot the session is authenticated with, if any
    pub const fn authenticated_slot(&self) -> Option<KeySlot> {
        match self.auth {
            AuthState::Authenticated(slot) => Some(slot),
            AuthState::Unauthenticated => None,
        }
    }

    /// Check if the session is authenticated
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }

    /// Check if the session still holds the tag
    pub const fn is_open(&self) -> bool {
        self.tag.is_some()
    }

    /// Mutually authenticate against a key slot of the selected application
    ///
    /// The cipher suite follows the key's variant. Any previous authentication
    /// is dropped before the exchange, so a failed attempt always leaves the
    /// session unauthenticated.
    #[instrument(skip(self, key), fields(uid = %self.uid(), variant = %key.variant()))]
    pub fn authenticate(&mut self, slot: KeySlot, key: &KeyMaterial) -> Result<()> {
        self.ensure_connected()?;

        self.auth = AuthState::Unauthenticated;
        self.exchange(&Command::Authenticate { slot, key })
            .map_err(|source| Error::AuthenticationFailed { slot, source })?;

        self.auth = AuthState::Authenticated(slot);
        debug!("Authenticated");
        Ok(())
    }

    /// Authenticate with a raw key buffer
    ///
    /// Without a variant the length picks one: 8 bytes for DES, 16 for AES. An
    /// invalid buffer fails before the authentication state is touched.
    pub fn authenticate_with_bytes(
        &mut self,
        slot: KeySlot,
        key: &[u8],
        variant: Option<KeyVariant>,
    ) -> Result<()> {
        let key = KeyMaterial::from_bytes_hint(key, variant)?;
        self.authenticate(slot, &key)
    }

    /// Select an application, or the card level with [`Aid::MASTER`]
    ///
    /// Selection always drops the authentication, even when it fails or when
    /// the application is already selected.
    #[instrument(skip(self), fields(uid = %self.uid()))]
    pub fn select_application(&mut self, aid: Aid) -> Result<()> {
        self.ensure_connected()?;

        self.auth = AuthState::Unauthenticated;
        self.exchange(&Command::SelectApplication { aid })
            .map_err(|source| Error::ApplicationSelectFailed { aid, source })?;

        self.selected = aid;
        debug!("Application selected");
        Ok(())
    }

    /// Disconnect from the tag and release it
    ///
    /// Closing an already closed session does nothing. A failed disconnect is
    /// logged; the transport is released either way.
    pub fn close(&mut self) {
        if let Some(mut tag) = self.tag.take() {
            self.auth = AuthState::Unauthenticated;
            match tag.disconnect() {
                Ok(()) => debug!(uid = %self.identity.uid(), "Session closed"),
                Err(e) => warn!(uid = %self.identity.uid(), error = %e, "Failed to disconnect tag"),
            }
        }
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.tag.is_none() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    pub(crate) fn ensure_authenticated(&self) -> Result<()> {
        if self.tag.is_none() {
            return Err(Error::NotConnected);
        }
        if !self.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }
        Ok(())
    }

    pub(crate) fn set_auth(&mut self, auth: AuthState) {
        self.auth = auth;
    }

    /// Transmit a command and turn a non-OK status into a failure
    pub(crate) fn exchange(
        &mut self,
        command: &Command<'_>,
    ) -> std::result::Result<Option<Bytes>, CardFailure> {
        let tag = self.tag.as_mut().ok_or(TransportError::Closed)?;
        let response = tag.transmit(command)?;

        response.into_result().map_err(|status| {
            warn!(
                uid = %self.identity.uid(),
                command = command.name(),
                status = %status,
                "Card rejected command"
            );
            CardFailure::Status(status)
        })
    }
}

impl<T: TagTransport> Drop for CardSession<'_, T> {
    fn drop(&mut self) {
        self.close();
    }
}
