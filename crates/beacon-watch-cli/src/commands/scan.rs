//! Scan command implementation.

use std::time::Duration;

use beacon_watch_core::{BeaconWatcher, UdpBeaconSource};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the scan command: listen for a fixed window, then print the registry.
pub async fn run_scan(args: ScanArgs, port: u16, json: bool) -> Result<(), CliError> {
    let formatter = get_formatter(json);

    let watcher = BeaconWatcher::new(UdpBeaconSource::new(port));
    watcher.set_heartbeat_timeout(Duration::from_secs(args.timeout));
    watcher.start_listening()?;

    if !json {
        println!("Scanning for beacons for {} seconds...", args.duration);
    }
    tokio::time::sleep(Duration::from_secs(args.duration)).await;

    let devices = watcher.discovered_devices();
    watcher.stop_listening();

    println!("{}", formatter.format_devices(&devices));

    if devices.is_empty() {
        return Err(CliError::NoBeaconsFound);
    }

    Ok(())
}
