//! Error types for the beacon-watch CLI.

use beacon_watch_core::WatchError;
use thiserror::Error;

/// Exit codes for the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NETWORK_ERROR: i32 = 2;
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No beacons found")]
    NoBeaconsFound,
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Watch(WatchError::Source(_)) => exit_codes::NETWORK_ERROR,
            CliError::Watch(_) => exit_codes::GENERAL_ERROR,
            CliError::Io(_) => exit_codes::GENERAL_ERROR,
            CliError::NoBeaconsFound => exit_codes::GENERAL_ERROR,
        }
    }
}
