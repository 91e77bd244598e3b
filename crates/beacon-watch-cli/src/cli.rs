//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};

/// beacon-watch - track nearby beacon devices from their advertisements
#[derive(Parser, Debug)]
#[command(name = "beacon-watch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// UDP port beacons broadcast on
    #[arg(long, global = true, default_value = "3331", env = "BEACON_WATCH_PORT")]
    pub port: u16,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream discovery events until interrupted
    Watch(WatchArgs),

    /// Discover beacons for a fixed window and print them
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Heartbeat timeout in seconds before a silent beacon is dropped
    #[arg(short = 't', long, default_value = "30")]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Scan duration in seconds
    #[arg(short, long, default_value = "5")]
    pub duration: u64,

    /// Heartbeat timeout in seconds before a silent beacon is dropped
    #[arg(short = 't', long, default_value = "30")]
    pub timeout: u64,
}
