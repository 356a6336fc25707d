//! Offline helpers: status derivation, payload decoding and config display.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::recording::{derive_status, display_key, NotificationBus, RecordingMode, SessionMetadata};

use super::args::{DecodeCliArgs, StatusCliArgs};

pub fn handle_status_command(args: StatusCliArgs) -> Result<()> {
    let metadata = SessionMetadata::parse(&args.metadata).context("Invalid room metadata")?;

    for mode in RecordingMode::ALL {
        let status = derive_status(&metadata, args.recording, mode);
        println!("{:<18} {}", mode.as_str(), status.as_str());
    }

    match display_key(&metadata, args.recording) {
        Some(key) => println!("Display: {}", key),
        None => println!("Display: none"),
    }
    Ok(())
}

pub fn handle_decode_command(args: DecodeCliArgs) -> Result<()> {
    match NotificationBus::decode(args.payload.as_bytes()) {
        Some(message) => {
            println!("Mode: {}", message.kind.mode());
            println!("Kind: {:?}", message.kind.kind());
            if let Some(data) = message.data {
                println!("Data: {}", data);
            }
        }
        None => println!("Not a recording notification"),
    }
    Ok(())
}

pub fn handle_config_command() -> Result<()> {
    let path = Config::config_path()?;
    let config = Config::load()?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;

    println!("# {}", path.display());
    println!("{}", rendered);
    Ok(())
}
