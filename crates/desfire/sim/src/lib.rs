//! In-memory reader and DESFire card for `nexum-desfire`
//!
//! This crate implements the transport traits of `nexum-desfire` on top of a
//! simulated card. The card keeps keys and applications in memory, runs a
//! three-pass mutual authentication with DES or AES-128 and applies the
//! permission rules of its key settings, so session code can be exercised
//! without hardware.
//!
//! Faults can be injected per tag: refused connections, failing version reads
//! and removal from the field.
//!
//! # Examples
//!
//! ```
//! use nexum_desfire::{CardSession, KeyMaterial, KeySlot, ReaderHandle, TagDirectory};
//! use nexum_desfire_transport_sim::{SimulatedCard, SimulatedDriver, SimulatedTag};
//!
//! # fn main() -> nexum_desfire::Result<()> {
//! let card = SimulatedCard::builder([0x04, 0xAA, 0xBB, 0xCC]).build();
//! let driver = SimulatedDriver::new().with_reader("sim-0", vec![SimulatedTag::desfire(card)]);
//!
//! let mut reader = ReaderHandle::open_first(&driver)?;
//! let directory = TagDirectory::default();
//! let mut session = CardSession::open_by_uid(&directory, &mut reader, "04AABBCC")?;
//!
//! session.authenticate(KeySlot::MASTER, &KeyMaterial::default_des())?;
//! let settings = session.get_key_settings()?;
//! assert_eq!(settings.max_keys, 1);
//! # Ok(())
//! # }
//! ```
//!
//! A session borrows the reader until it is dropped, so the reader can be
//! neither re-enumerated nor closed underneath it:
//!
//! ```compile_fail
//! # use nexum_desfire::{CardSession, ReaderHandle, TagDirectory};
//! # use nexum_desfire_transport_sim::{SimulatedCard, SimulatedDriver, SimulatedTag};
//! # fn main() -> nexum_desfire::Result<()> {
//! # let card = SimulatedCard::builder([0x04, 0xAA, 0xBB, 0xCC]).build();
//! # let driver = SimulatedDriver::new().with_reader("sim-0", vec![SimulatedTag::desfire(card)]);
//! let mut reader = ReaderHandle::open_first(&driver)?;
//! let directory = TagDirectory::default();
//! let mut session = CardSession::open_by_uid(&directory, &mut reader, "04AABBCC")?;
//!
//! directory.enumerate(&mut reader)?;
//! session.get_key_settings()?;
//! # Ok(())
//! # }
//! ```
//!
//! ```compile_fail
//! # use nexum_desfire::{CardSession, KeyMaterial, KeySlot, ReaderHandle, TagDirectory};
//! # use nexum_desfire_transport_sim::{SimulatedCard, SimulatedDriver, SimulatedTag};
//! # fn main() -> nexum_desfire::Result<()> {
//! # let card = SimulatedCard::builder([0x04, 0xAA, 0xBB, 0xCC]).build();
//! # let driver = SimulatedDriver::new().with_reader("sim-0", vec![SimulatedTag::desfire(card)]);
//! let mut reader = ReaderHandle::open_first(&driver)?;
//! let mut session = CardSession::open_by_uid(&TagDirectory::default(), &mut reader, "04AABBCC")?;
//!
//! reader.close()?;
//! drop(reader);
//! session.authenticate(KeySlot::MASTER, &KeyMaterial::default_des())?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod card;
mod crypto;
mod driver;
mod tag;

pub use card::{MAX_APPLICATION_KEYS, SimulatedCard, SimulatedCardBuilder};
pub use driver::{SimulatedDriver, SimulatedReader};
pub use tag::{SimulatedTag, TagStats};
