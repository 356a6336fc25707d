use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::recording::{RecordingLanguage, RecordingMode};

#[derive(Parser, Debug)]
#[command(name = "roomrec")]
#[command(about = "Recording and transcription control for conference rooms", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Start a recording mode in a room
    Start(StartCliArgs),
    /// Stop the recording running in a room
    Stop(StopCliArgs),
    /// Derive the recording status from a room metadata snapshot
    Status(StatusCliArgs),
    /// Decode a peer notification payload
    Decode(DecodeCliArgs),
    /// Show the effective configuration
    Config,
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct StartCliArgs {
    /// Room identifier
    #[arg(short, long)]
    pub room: String,
    /// Recording mode (transcript or screen_recording)
    #[arg(short, long)]
    pub mode: RecordingMode,
    /// Transcription language (en, fr, auto); defaults to the configured one
    #[arg(short, long)]
    pub language: Option<RecordingLanguage>,
    /// Also transcribe a screen recording
    #[arg(long)]
    pub transcribe: bool,
}

#[derive(ClapArgs, Debug)]
pub struct StopCliArgs {
    /// Room identifier
    #[arg(short, long)]
    pub room: String,
}

#[derive(ClapArgs, Debug)]
pub struct StatusCliArgs {
    /// Room metadata JSON, e.g. '{"recording_mode":"transcript","recording_status":"started"}'
    #[arg(short, long, default_value = "")]
    pub metadata: String,
    /// The room's recording indicator is on
    #[arg(short, long)]
    pub recording: bool,
}

#[derive(ClapArgs, Debug)]
pub struct DecodeCliArgs {
    /// Raw payload as received on the data channel
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let cli = Cli::try_parse_from([
            "roomrec",
            "start",
            "--room",
            "abc",
            "--mode",
            "screen-recording",
            "--language",
            "auto",
            "--transcribe",
        ])
        .unwrap();

        match cli.command {
            CliCommand::Start(args) => {
                assert_eq!(args.room, "abc");
                assert_eq!(args.mode, RecordingMode::ScreenRecording);
                assert_eq!(args.language, Some(RecordingLanguage::Automatic));
                assert!(args.transcribe);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["roomrec", "start", "--room", "abc", "--mode", "video"]).is_err());
    }

    #[test]
    fn test_status_defaults_to_empty_metadata() {
        let cli = Cli::try_parse_from(["roomrec", "-v", "status"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            CliCommand::Status(args) => {
                assert!(args.metadata.is_empty());
                assert!(!args.recording);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
