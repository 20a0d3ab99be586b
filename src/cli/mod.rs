//! CLI command implementations

pub mod error;
pub mod migrate;
pub mod status;

pub use error::CliError;
pub use migrate::{BackupArgs, Cli, Commands, CopyArgs, OutputFormat};
pub use status::StatusArgs;
