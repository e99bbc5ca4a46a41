//! Walk through a DESFire session on a simulated reader
//!
//! The reader holds the requested DESFire card, a Mifare Classic tag and a
//! DESFire tag that refuses connections. The example scans the field, opens a
//! session to the card, rotates its master key to AES, creates an application
//! and finally formats the card.
//!
//! Run with `RUST_LOG=debug` to see the session logs.

use clap::Parser;
use nexum_desfire::prelude::*;
use nexum_desfire::{KeySettingsInfo, TagType};
use nexum_desfire_transport_sim::{SimulatedCard, SimulatedDriver, SimulatedTag};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// UID of the simulated DESFire card, as upper-case hex
    #[arg(short, long, default_value = "04AABBCC")]
    uid: String,

    /// Abort the scan on the first unreachable tag
    #[arg(long)]
    strict: bool,

    /// Application id to create, as hex
    #[arg(short, long, default_value = "000001")]
    aid: String,

    /// Keep the created application instead of formatting the card
    #[arg(long)]
    keep_applications: bool,
}

fn print_settings(info: &KeySettingsInfo) {
    println!(
        "  settings {} ({} key(s), {})",
        info.settings,
        info.max_keys,
        info.key_variant
            .map_or_else(|| "DES".to_string(), |variant| variant.to_string())
    );
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let uid = Uid::from_hex(&cli.uid)?;
    let aid = Aid::new(u32::from_str_radix(&cli.aid, 16)?)?;

    let unreachable =
        SimulatedTag::desfire(SimulatedCard::builder([0x04, 0xDE, 0xAD, 0x00]).build());
    unreachable.refuse_connections(true);
    let driver = SimulatedDriver::new().with_reader(
        "sim-reader-0",
        vec![
            SimulatedTag::desfire(SimulatedCard::builder(uid.clone()).build()),
            SimulatedTag::other([0x08, 0x12, 0x34, 0x56], TagType::Classic1k),
            unreachable,
        ],
    );

    let mut reader = ReaderHandle::open_first(&driver)?;
    println!("Using reader: {}", reader.name().unwrap_or_default());

    let config = if cli.strict {
        DirectoryConfig::new().with_policy(EnumerationPolicy::Strict)
    } else {
        DirectoryConfig::new()
    };
    let directory = TagDirectory::new(config);

    let scan = match directory.scan(&mut reader) {
        Ok(scan) => scan,
        Err(e) => {
            println!("Scan failed: {e}");
            return Ok(());
        }
    };
    println!("{} tag(s) in the field", scan.present());
    for identity in scan.identities() {
        println!("  {} {}", identity.uid(), identity.friendly_name());
    }
    for skipped in scan.skipped() {
        println!("  {} skipped: {}", skipped.uid, skipped.reason);
    }

    let mut session = CardSession::open_by_uid(&directory, &mut reader, &uid.to_string())?;
    println!("Session opened to {}", session.uid());

    println!("Authenticating with the factory DES key...");
    session.authenticate(KeySlot::MASTER, &KeyMaterial::default_des())?;

    println!("Rotating the card master key to AES...");
    session.change_key_with_bytes(KeySlot::MASTER, &[0u8; 8], &[0u8; 16])?;
    print_settings(&session.get_key_settings()?);

    session.authenticate_with_bytes(KeySlot::MASTER, &[0u8; 16], Some(KeyVariant::Aes))?;
    println!("Creating application {aid}...");
    session.create_application(aid, KeySettings::FACTORY_DEFAULT, 2)?;
    println!("Applications: {:?}", session.list_application_ids()?);

    session.select_application(aid)?;
    print_settings(&session.get_key_settings()?);

    if !cli.keep_applications {
        session.select_application(Aid::MASTER)?;
        session.authenticate(KeySlot::MASTER, &KeyMaterial::default_aes())?;
        println!("Formatting the card...");
        session.format()?;
        println!("Applications: {:?}", session.list_application_ids()?);
    }

    // The session borrows the reader until it is gone
    session.close();
    drop(session);
    reader.close()?;
    Ok(())
}
