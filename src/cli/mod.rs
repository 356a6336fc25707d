pub mod args;
pub mod inspect;
pub mod recording;

pub use args::{Cli, CliCommand};
pub use inspect::{handle_config_command, handle_decode_command, handle_status_command};
pub use recording::{handle_start_command, handle_stop_command};
