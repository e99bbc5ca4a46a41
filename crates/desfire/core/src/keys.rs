//! Key administration of the selected application

use tracing::{debug, instrument};

use crate::session::{AuthState, CardSession};
use crate::transport::TagTransport;
use crate::{
    AES_KEY_LEN, CardFailure, Command, Error, KeyMaterial, KeySettings, KeySettingsInfo, KeySlot,
    KeyVariant, Result,
};

impl<T: TagTransport> CardSession<'_, T> {
    /// Read the key settings and key count of the selected application
    ///
    /// Works without authentication unless the card requires it.
    #[instrument(skip(self), fields(uid = %self.uid()))]
    pub fn get_key_settings(&mut self) -> Result<KeySettingsInfo> {
        self.ensure_connected()?;

        let payload = self
            .exchange(&Command::GetKeySettings)
            .map_err(Error::KeySettingsReadFailed)?;

        payload
            .as_deref()
            .and_then(KeySettingsInfo::from_payload)
            .ok_or_else(|| {
                Error::KeySettingsReadFailed(CardFailure::MalformedResponse(
                    "expected 2 byte key settings",
                ))
            })
    }

    /// Replace the key settings of the selected application
    #[instrument(skip(self), fields(uid = %self.uid()))]
    pub fn set_key_settings(&mut self, settings: KeySettings) -> Result<()> {
        self.ensure_authenticated()?;

        self.exchange(&Command::ChangeKeySettings { settings })
            .map_err(Error::KeySettingsChangeFailed)?;

        debug!("Key settings changed");
        Ok(())
    }

    /// Replace the key in `slot` of the selected application
    ///
    /// The new key must be an AES key; the old key may be either variant.
    /// Changing the key the session is authenticated with ends the
    /// authentication, since the card drops the session key with it.
    #[instrument(skip(self, old_key, new_key), fields(uid = %self.uid()))]
    pub fn change_key(
        &mut self,
        slot: KeySlot,
        old_key: &KeyMaterial,
        new_key: &KeyMaterial,
    ) -> Result<()> {
        if !new_key.is_aes() {
            return Err(Error::InvalidKeyLength {
                expected: Some(AES_KEY_LEN),
                actual: new_key.len(),
            });
        }
        self.ensure_authenticated()?;

        self.exchange(&Command::ChangeKey {
            slot,
            old_key,
            new_key,
        })
        .map_err(|source| Error::KeyChangeFailed { slot, source })?;

        if self.authenticated_slot() == Some(slot) {
            debug!("Changed the authenticated key, session key dropped");
            self.set_auth(AuthState::Unauthenticated);
        } else {
            debug!("Key changed");
        }
        Ok(())
    }

    /// Replace a key using raw buffers
    ///
    /// `old_key` must be 8 or 16 bytes and `new_key` exactly 16; both are
    /// checked before anything else.
    pub fn change_key_with_bytes(
        &mut self,
        slot: KeySlot,
        old_key: &[u8],
        new_key: &[u8],
    ) -> Result<()> {
        let old_key = KeyMaterial::from_bytes(old_key)?;
        let new_key = KeyMaterial::with_variant(new_key, KeyVariant::Aes)?;
        self.change_key(slot, &old_key, &new_key)
    }
}
