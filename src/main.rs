use anyhow::Result;
use clap::Parser;
use roomrec::cli::{
    handle_config_command, handle_decode_command, handle_start_command, handle_status_command,
    handle_stop_command, Cli, CliCommand,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        CliCommand::Start(args) => handle_start_command(args).await,
        CliCommand::Stop(args) => handle_stop_command(args).await,
        CliCommand::Status(args) => handle_status_command(args),
        CliCommand::Decode(args) => handle_decode_command(args),
        CliCommand::Config => handle_config_command(),
        CliCommand::Version => {
            println!("roomrec {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
