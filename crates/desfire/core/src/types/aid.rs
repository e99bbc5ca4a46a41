use std::fmt;

use crate::{Error, Result};

/// Application identifier, a 24-bit number naming one application on a card
///
/// [`Aid::MASTER`] (`000000`) denotes the card (PICC) level itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Aid(u32);

impl Aid {
    /// The card-level application, selected by default after connect
    pub const MASTER: Self = Self(0);

    /// Largest representable application id
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create an application id, rejecting values wider than 24 bits
    pub const fn new(aid: u32) -> Result<Self> {
        if aid > Self::MAX {
            return Err(Error::InvalidApplicationId(aid));
        }
        Ok(Self(aid))
    }

    /// Numeric value
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Whether this is the card-level application
    pub const fn is_master(&self) -> bool {
        self.0 == 0
    }

    /// Little-endian three byte encoding, as carried in card payloads
    pub const fn to_le_bytes(&self) -> [u8; 3] {
        let b = self.0.to_le_bytes();
        [b[0], b[1], b[2]]
    }

    /// Decode the three byte little-endian encoding
    pub const fn from_le_bytes(bytes: [u8; 3]) -> Self {
        Self(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
    }
}

impl TryFrom<u32> for Aid {
    type Error = Error;

    fn try_from(aid: u32) -> Result<Self> {
        Self::new(aid)
    }
}

impl From<Aid> for u32 {
    fn from(aid: Aid) -> Self {
        aid.0
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

impl fmt::Debug for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aid({self})")
    }
}
