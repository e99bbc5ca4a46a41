use derive_more::Display;

/// Version details of either the hardware or the software part of a DESFire chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartVersion {
    /// Vendor id (0x04 for NXP)
    pub vendor_id: u8,
    /// Type
    pub kind: u8,
    /// Subtype
    pub subtype: u8,
    /// Major version number
    pub version_major: u8,
    /// Minor version number
    pub version_minor: u8,
    /// Storage size class
    pub storage_size: u8,
    /// Communication protocol type
    pub protocol: u8,
}

impl PartVersion {
    /// Decode the seven byte frame returned for one GetVersion part
    pub const fn from_bytes(bytes: [u8; 7]) -> Self {
        Self {
            vendor_id: bytes[0],
            kind: bytes[1],
            subtype: bytes[2],
            version_major: bytes[3],
            version_minor: bytes[4],
            storage_size: bytes[5],
            protocol: bytes[6],
        }
    }

    /// Encode as the seven byte GetVersion frame
    pub const fn to_bytes(&self) -> [u8; 7] {
        [
            self.vendor_id,
            self.kind,
            self.subtype,
            self.version_major,
            self.version_minor,
            self.storage_size,
            self.protocol,
        ]
    }
}

/// Chip generation derived from the hardware major version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Generation {
    /// Original DESFire (MF3ICD40)
    #[display("D40")]
    D40,
    /// DESFire EV1
    #[display("EV1")]
    Ev1,
    /// DESFire EV2
    #[display("EV2")]
    Ev2,
    /// DESFire EV3
    #[display("EV3")]
    Ev3,
    /// DESFire Light
    #[display("Light")]
    Light,
    /// Any other major version
    #[display("unknown ({_0:#04x})")]
    Unknown(u8),
}

/// GetVersion information of a DESFire tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionInfo {
    /// Hardware part
    pub hardware: PartVersion,
    /// Software part
    pub software: PartVersion,
    /// UID as reported by the card (7 bytes)
    pub uid: [u8; 7],
    /// Production batch number
    pub batch_number: [u8; 5],
    /// Production calendar week
    pub production_week: u8,
    /// Production year
    pub production_year: u8,
}

impl VersionInfo {
    /// Chip generation
    pub const fn generation(&self) -> Generation {
        match self.hardware.version_major {
            0x00 => Generation::D40,
            0x01 => Generation::Ev1,
            0x12 => Generation::Ev2,
            0x33 => Generation::Ev3,
            0x30 => Generation::Light,
            other => Generation::Unknown(other),
        }
    }

    /// Storage capacity in bytes announced by the software part
    ///
    /// The storage size class encodes `2^(n >> 1)` bytes; an odd class means the
    /// capacity lies between that value and the next power of two, in which case
    /// the lower bound is returned.
    pub const fn storage_bytes(&self) -> u32 {
        let exponent = (self.software.storage_size >> 1) as u32;
        if exponent >= 32 {
            return u32::MAX;
        }
        1 << exponent
    }

    /// Whether the storage size class marks an inexact capacity
    pub const fn storage_is_approximate(&self) -> bool {
        self.software.storage_size & 0x01 == 0x01
    }

    /// Friendly chip name, e.g. `Mifare DESFire EV1`
    pub fn friendly_name(&self) -> String {
        match self.generation() {
            Generation::D40 => "Mifare DESFire".to_string(),
            Generation::Unknown(_) => "Mifare DESFire (unknown generation)".to_string(),
            generation => format!("Mifare DESFire {generation}"),
        }
    }
}
