//! Shared fixtures for the simulated reader tests
#![allow(dead_code)]

use hex_literal::hex;
use nexum_desfire::{
    CardSession, KeyMaterial, ReaderHandle, TagDirectory, TagTransport, TagType,
};
use nexum_desfire_transport_sim::{SimulatedCard, SimulatedDriver, SimulatedReader, SimulatedTag};

/// Name of the reader every fixture plugs its tags into
pub(crate) const READER: &str = "sim-reader-0";

/// A non-default AES key used when rotating keys
pub(crate) const ROTATED_KEY: [u8; 16] = hex!("00112233445566778899AABBCCDDEEFF");

/// Install a test subscriber so `RUST_LOG` shows the session logs
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A factory-fresh DESFire tag
pub(crate) fn desfire_tag(uid: &[u8]) -> SimulatedTag {
    SimulatedTag::desfire(SimulatedCard::builder(uid).build())
}

/// A tag of another family
pub(crate) fn classic_tag(uid: &[u8]) -> SimulatedTag {
    SimulatedTag::other(uid, TagType::Classic1k)
}

/// Open the fixture reader with the given tags in its field
pub(crate) fn open_reader(tags: Vec<SimulatedTag>) -> ReaderHandle<SimulatedReader> {
    init_tracing();
    let driver = SimulatedDriver::new().with_reader(READER, tags);
    ReaderHandle::open_first(&driver).expect("simulated reader opens")
}

/// Open a session to `tag` on `reader`, which holds the session's borrow
pub(crate) fn open_session<'r>(
    reader: &'r mut ReaderHandle<SimulatedReader>,
    tag: &SimulatedTag,
) -> CardSession<'r, SimulatedTag> {
    let uid = tag.uid().to_string();
    CardSession::open_by_uid(&TagDirectory::default(), reader, &uid).expect("session opens")
}

/// The rotated AES key as key material
pub(crate) fn rotated_key() -> KeyMaterial {
    KeyMaterial::from_bytes(&ROTATED_KEY).expect("16 byte key")
}
