//! CLI handlers that talk to the recording backend.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::recording::{
    BackendError, HttpRecordingBackend, RecordingBackend, SessionMetadata, StartOptions,
};

use super::args::{StartCliArgs, StopCliArgs};

pub async fn handle_start_command(args: StartCliArgs) -> Result<()> {
    let config = Config::load()?;
    let backend = HttpRecordingBackend::new(&config.backend)
        .context("Failed to initialize recording backend")?;

    let language = args.language.unwrap_or(config.session.language);
    let options = StartOptions {
        language: None,
        transcribe: args.transcribe,
    }
    .with_default_language(language);

    match backend.start_recording(&args.room, args.mode, &options).await {
        Ok(metadata) => {
            println!("Requested {} in room {}", args.mode, args.room);
            print_metadata(&metadata);
            Ok(())
        }
        Err(BackendError::AlreadyStarted) => {
            println!("A recording is already running in room {}", args.room);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to start {} in room {}", args.mode, args.room)),
    }
}

pub async fn handle_stop_command(args: StopCliArgs) -> Result<()> {
    let config = Config::load()?;
    let backend = HttpRecordingBackend::new(&config.backend)
        .context("Failed to initialize recording backend")?;

    let metadata = backend
        .stop_recording(&args.room)
        .await
        .with_context(|| format!("Failed to stop recording in room {}", args.room))?;

    println!("Requested stop in room {}", args.room);
    print_metadata(&metadata);
    Ok(())
}

fn print_metadata(metadata: &SessionMetadata) {
    match (metadata.recording_mode, metadata.recording_status) {
        (Some(mode), Some(status)) => println!("  Backend reports {} as {:?}", mode, status),
        _ => println!("  Backend returned no recording metadata yet"),
    }
}
