//! Key material for DESFire authentication and key changes
//!
//! A key is either a DES key (8 bytes) or an AES-128 key (16 bytes). The variant
//! is carried in the type and the length is fixed by the array inside it, so a
//! [`KeyMaterial`] can never hold a partially initialised or truncated buffer.

use std::fmt;

use derive_more::Display;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// Length of a DES key in bytes
pub const DES_KEY_LEN: usize = 8;
/// Length of an AES-128 key in bytes
pub const AES_KEY_LEN: usize = 16;

/// Cipher family of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum KeyVariant {
    /// DES/3DES (8 byte key, legacy authentication)
    #[display("DES")]
    Des,
    /// AES-128 (16 byte key)
    #[display("AES")]
    Aes,
}

impl KeyVariant {
    /// Key length required by this variant
    pub const fn key_len(&self) -> usize {
        match self {
            Self::Des => DES_KEY_LEN,
            Self::Aes => AES_KEY_LEN,
        }
    }

    /// Variant implied by a key length, if any
    pub const fn from_len(len: usize) -> Option<Self> {
        match len {
            DES_KEY_LEN => Some(Self::Des),
            AES_KEY_LEN => Some(Self::Aes),
            _ => None,
        }
    }
}

/// A DES or AES key
///
/// Key bytes are wiped when the value is dropped and never appear in `Debug`
/// output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum KeyMaterial {
    /// DES key
    Des([u8; DES_KEY_LEN]),
    /// AES-128 key
    Aes([u8; AES_KEY_LEN]),
}

impl KeyMaterial {
    /// Build a key from a raw buffer, choosing the variant from its length
    ///
    /// Fails with [`Error::InvalidKeyLength`] unless the buffer is 8 or 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match KeyVariant::from_len(bytes.len()) {
            Some(variant) => Self::with_variant(bytes, variant),
            None => Err(Error::InvalidKeyLength {
                expected: None,
                actual: bytes.len(),
            }),
        }
    }

    /// Build a key of the given variant, requiring the buffer length to match it
    pub fn with_variant(bytes: &[u8], variant: KeyVariant) -> Result<Self> {
        let invalid = || Error::InvalidKeyLength {
            expected: Some(variant.key_len()),
            actual: bytes.len(),
        };

        match variant {
            KeyVariant::Des => <[u8; DES_KEY_LEN]>::try_from(bytes)
                .map(Self::Des)
                .map_err(|_| invalid()),
            KeyVariant::Aes => <[u8; AES_KEY_LEN]>::try_from(bytes)
                .map(Self::Aes)
                .map_err(|_| invalid()),
        }
    }

    /// Build a key with an optional variant hint
    ///
    /// Without a hint the length decides; with one the length must agree with it.
    pub fn from_bytes_hint(bytes: &[u8], variant: Option<KeyVariant>) -> Result<Self> {
        match variant {
            Some(variant) => Self::with_variant(bytes, variant),
            None => Self::from_bytes(bytes),
        }
    }

    /// All-zero DES key, the factory default card master key
    pub const fn default_des() -> Self {
        Self::Des([0u8; DES_KEY_LEN])
    }

    /// All-zero AES key
    pub const fn default_aes() -> Self {
        Self::Aes([0u8; AES_KEY_LEN])
    }

    /// Cipher family of this key
    pub const fn variant(&self) -> KeyVariant {
        match self {
            Self::Des(_) => KeyVariant::Des,
            Self::Aes(_) => KeyVariant::Aes,
        }
    }

    /// Raw key bytes
    ///
    /// Only transports should need this; callers must not log or persist it.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Des(key) => key,
            Self::Aes(key) => key,
        }
    }

    /// Key length in bytes
    pub const fn len(&self) -> usize {
        self.variant().key_len()
    }

    /// Always false; present for API symmetry with `len`
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether this is an AES key
    pub const fn is_aes(&self) -> bool {
        matches!(self, Self::Aes(_))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial::{}(<redacted>)", self.variant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_variant_from_length() {
        let des = KeyMaterial::from_bytes(&[0u8; 8]).unwrap();
        assert_eq!(des.variant(), KeyVariant::Des);
        assert_eq!(des.len(), 8);

        let aes = KeyMaterial::from_bytes(&hex!("00112233445566778899AABBCCDDEEFF")).unwrap();
        assert_eq!(aes.variant(), KeyVariant::Aes);
        assert_eq!(aes.as_bytes()[15], 0xFF);
    }

    #[test]
    fn test_invalid_lengths() {
        for len in (0..40).filter(|len| *len != 8 && *len != 16) {
            let bytes = vec![0u8; len];
            match KeyMaterial::from_bytes(&bytes) {
                Err(Error::InvalidKeyLength { expected, actual }) => {
                    assert_eq!(expected, None);
                    assert_eq!(actual, len);
                }
                other => panic!("unexpected result for length {len}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_variant_mismatch() {
        assert!(matches!(
            KeyMaterial::with_variant(&[0u8; 8], KeyVariant::Aes),
            Err(Error::InvalidKeyLength {
                expected: Some(16),
                actual: 8
            })
        ));
        assert!(matches!(
            KeyMaterial::with_variant(&[0u8; 16], KeyVariant::Des),
            Err(Error::InvalidKeyLength {
                expected: Some(8),
                actual: 16
            })
        ));
        assert!(matches!(
            KeyMaterial::from_bytes_hint(&[0u8; 15], Some(KeyVariant::Aes)),
            Err(Error::InvalidKeyLength {
                expected: Some(16),
                actual: 15
            })
        ));
        assert!(KeyMaterial::from_bytes_hint(&[0u8; 16], None).unwrap().is_aes());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = KeyMaterial::with_variant(&hex!("DEADBEEFCAFEBABE"), KeyVariant::Des).unwrap();
        let rendered = format!("{key:?}");
        assert_eq!(rendered, "KeyMaterial::DES(<redacted>)");
        assert!(!rendered.to_lowercase().contains("dead"));
    }

    #[test]
    fn test_zeroize_wipes_bytes() {
        let mut key = KeyMaterial::Aes([0xA5; 16]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; 16]);
    }
}
