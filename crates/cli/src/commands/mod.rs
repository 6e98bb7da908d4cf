pub mod config;
pub mod run;
pub mod utils;

pub use config::{handle_config_command, ConfigCommands};
pub use run::{run, RunArgs};
