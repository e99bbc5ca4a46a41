use std::fmt;

use bytes::Bytes;
use derive_more::Display;

/// Hardware identifier of a tag, read once when the tag is discovered
///
/// Rendered as upper-case hex without separators, e.g. `04AABBCC`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Uid(Bytes);

impl Uid {
    /// Create a UID from raw bytes
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Parse a UID from its hex rendering (either case)
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(hex).map(|bytes| Self(Bytes::from(bytes)))
    }

    /// Raw UID bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the UID in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the UID is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exact comparison against a rendered UID string
    ///
    /// The comparison is byte-exact and case-sensitive on the rendering.
    pub fn matches(&self, rendered: &str) -> bool {
        self.to_string() == rendered
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({self})")
    }
}

impl From<&[u8]> for Uid {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<[u8; N]> for Uid {
    fn from(bytes: [u8; N]) -> Self {
        Self(Bytes::copy_from_slice(&bytes))
    }
}

/// Chip family reported by the reader for a discovered tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TagType {
    /// MIFARE DESFire (any generation)
    #[display("Mifare DESFire")]
    DesFire,
    /// MIFARE Classic 1k
    #[display("Mifare Classic 1k")]
    Classic1k,
    /// MIFARE Classic 4k
    #[display("Mifare Classic 4k")]
    Classic4k,
    /// MIFARE Ultralight
    #[display("Mifare UltraLight")]
    Ultralight,
    /// MIFARE Ultralight C
    #[display("Mifare UltraLightC")]
    UltralightC,
    /// Any other ISO 14443 tag
    #[display("Unknown tag")]
    Other,
}

impl TagType {
    /// Whether the tag speaks the DESFire protocol
    pub const fn is_desfire(&self) -> bool {
        matches!(self, Self::DesFire)
    }
}
