//! CLI error types and conversions

use crate::migrator::MigrationError;
use crate::resume::ResumeError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Migration error
    #[error("migration error: {0}")]
    MigrationError(#[from] MigrationError),

    /// Store error
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Resume error
    #[error("resume error: {0}")]
    ResumeError(#[from] ResumeError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
