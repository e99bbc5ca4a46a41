//! DESFire commands as opaque remote procedure calls
//!
//! The byte-level framing and the secure messaging of each command belong to the
//! tag transport. This module only names the operation and carries its arguments.

use crate::{Aid, KeyMaterial, KeySettings, KeySlot, KeyVariant};

/// A DESFire command issued through [`TagTransport::transmit`](crate::TagTransport::transmit)
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    /// Mutual authentication against a key slot, using the cipher suite of the key's variant
    Authenticate {
        /// Key slot to authenticate against
        slot: KeySlot,
        /// Key expected to be installed in the slot
        key: &'a KeyMaterial,
    },
    /// Replace the key in a slot
    ChangeKey {
        /// Slot to change
        slot: KeySlot,
        /// Key currently installed in the slot
        old_key: &'a KeyMaterial,
        /// Key to install
        new_key: &'a KeyMaterial,
    },
    /// Read the key settings and key count of the selected application
    GetKeySettings,
    /// Replace the key settings of the selected application
    ChangeKeySettings {
        /// New settings bitmask
        settings: KeySettings,
    },
    /// Erase all applications and keys on the card
    FormatPicc,
    /// Select an application (or the card level)
    SelectApplication {
        /// Application to select
        aid: Aid,
    },
    /// Create a new application
    CreateApplication {
        /// Application id
        aid: Aid,
        /// Key settings of the application
        settings: KeySettings,
        /// Number of keys
        key_count: u8,
        /// Key cryptography of the application
        key_variant: KeyVariant,
    },
    /// List application ids present on the card
    GetApplicationIds,
}

impl Command<'_> {
    /// Native DESFire instruction code of the command
    pub const fn instruction(&self) -> u8 {
        match self {
            Self::Authenticate { key, .. } => match key.variant() {
                KeyVariant::Des => 0x0A,
                KeyVariant::Aes => 0xAA,
            },
            Self::ChangeKey { .. } => 0xC4,
            Self::GetKeySettings => 0x45,
            Self::ChangeKeySettings { .. } => 0x54,
            Self::FormatPicc => 0xFC,
            Self::SelectApplication { .. } => 0x5A,
            Self::CreateApplication { .. } => 0xCA,
            Self::GetApplicationIds => 0x6A,
        }
    }

    /// Short command name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "Authenticate",
            Self::ChangeKey { .. } => "ChangeKey",
            Self::GetKeySettings => "GetKeySettings",
            Self::ChangeKeySettings { .. } => "ChangeKeySettings",
            Self::FormatPicc => "FormatPICC",
            Self::SelectApplication { .. } => "SelectApplication",
            Self::CreateApplication { .. } => "CreateApplication",
            Self::GetApplicationIds => "GetApplicationIDs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_instruction_follows_key_variant() {
        let des = KeyMaterial::default_des();
        let aes = KeyMaterial::default_aes();
        let by_des = Command::Authenticate {
            slot: KeySlot::MASTER,
            key: &des,
        };
        let by_aes = Command::Authenticate {
            slot: KeySlot::MASTER,
            key: &aes,
        };
        assert_eq!(by_des.instruction(), 0x0A);
        assert_eq!(by_aes.instruction(), 0xAA);
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let key = KeyMaterial::Aes([0x42; 16]);
        let cmd = Command::ChangeKey {
            slot: KeySlot::new(1),
            old_key: &key,
            new_key: &key,
        };
        let rendered = format!("{cmd:?}");
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("66"));
        assert_eq!(cmd.name(), "ChangeKey");
    }
}
