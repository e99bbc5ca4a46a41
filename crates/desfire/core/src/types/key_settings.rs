use std::fmt;

use derive_more::{Display, From, Into};

use crate::KeyVariant;

/// Index of a key position within the selected application (or the card master context)
///
/// The valid range is a card-side attribute (see [`KeySettingsInfo::max_keys`]),
/// so no range check happens locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct KeySlot(u8);

impl KeySlot {
    /// The master key of the selected application
    pub const MASTER: Self = Self(0);

    /// Create a key slot
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Slot index
    pub const fn index(&self) -> u8 {
        self.0
    }
}

/// Who may change keys of the selected application, from the high nibble of the settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKeyAccess {
    /// Authentication with the application master key is required
    MasterKey,
    /// Authentication with the given key is required
    Key(KeySlot),
    /// Authentication with the key being changed is required
    SameKey,
    /// All keys except the master key are frozen
    Frozen,
}

/// Key settings bitmask controlling authentication requirements and key changes
#[derive(Clone, Copy, PartialEq, Eq, Hash, From, Into)]
pub struct KeySettings(u8);

impl KeySettings {
    /// The master key may be changed (after authenticating with it)
    pub const ALLOW_CHANGE_MASTER_KEY: u8 = 0x01;
    /// Directory listing does not need master key authentication
    pub const FREE_DIRECTORY_LIST: u8 = 0x02;
    /// Creating and deleting applications/files does not need master key authentication
    pub const FREE_CREATE_DELETE: u8 = 0x04;
    /// The key settings themselves may be changed
    pub const CONFIGURATION_CHANGEABLE: u8 = 0x08;

    /// Factory default: everything allowed, master key changes keys
    pub const FACTORY_DEFAULT: Self = Self(0x0F);

    /// Create settings from the raw bitmask
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bitmask
    pub const fn bits(&self) -> u8 {
        self.0
    }

    const fn has(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    /// Whether the master key can be changed
    pub const fn allows_master_key_change(&self) -> bool {
        self.has(Self::ALLOW_CHANGE_MASTER_KEY)
    }

    /// Whether listing applications/files is free
    pub const fn free_directory_list(&self) -> bool {
        self.has(Self::FREE_DIRECTORY_LIST)
    }

    /// Whether creating and deleting is free
    pub const fn free_create_delete(&self) -> bool {
        self.has(Self::FREE_CREATE_DELETE)
    }

    /// Whether the settings can still be changed
    pub const fn configuration_changeable(&self) -> bool {
        self.has(Self::CONFIGURATION_CHANGEABLE)
    }

    /// Change-key access rule encoded in the high nibble
    pub const fn change_key_access(&self) -> ChangeKeyAccess {
        match self.0 >> 4 {
            0x0 => ChangeKeyAccess::MasterKey,
            0xE => ChangeKeyAccess::SameKey,
            0xF => ChangeKeyAccess::Frozen,
            n => ChangeKeyAccess::Key(KeySlot::new(n)),
        }
    }
}

impl fmt::Display for KeySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

impl fmt::Debug for KeySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeySettings({:#04x})", self.0)
    }
}

/// Key settings as reported by the card for the selected application
///
/// Not cached by the session: settings and key count change as a side effect of
/// key administration, so every read goes to the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySettingsInfo {
    /// Settings bitmask
    pub settings: KeySettings,
    /// Number of keys in the selected application
    pub max_keys: u8,
    /// Key cryptography flagged by the card, if any bits are set
    pub key_variant: Option<KeyVariant>,
}

impl KeySettingsInfo {
    /// Decode the two byte GetKeySettings payload
    pub(crate) fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [settings, keys] => Some(Self {
                settings: KeySettings::new(*settings),
                max_keys: keys & 0x0F,
                key_variant: (keys & 0x80 != 0).then_some(KeyVariant::Aes),
            }),
            _ => None,
        }
    }

    /// Encode as the two byte GetKeySettings payload
    ///
    /// `None` when the key count does not fit the payload's four bit field.
    pub fn to_payload(&self) -> Option<[u8; 2]> {
        if self.max_keys > 0x0F {
            return None;
        }
        let crypto = match self.key_variant {
            Some(KeyVariant::Aes) => 0x80,
            _ => 0x00,
        };
        Some([self.settings.bits(), self.max_keys | crypto])
    }
}
