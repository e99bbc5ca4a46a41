//! Identifiers and card attributes shared by the session API

mod aid;
mod key_settings;
mod uid;
mod version;

pub use aid::Aid;
pub use key_settings::{ChangeKeyAccess, KeySettings, KeySettingsInfo, KeySlot};
pub use uid::{TagType, Uid};
pub use version::{Generation, PartVersion, VersionInfo};
