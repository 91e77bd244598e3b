//! Watch command implementation.

use std::time::Duration;

use beacon_watch_core::{BeaconWatcher, UdpBeaconSource, WatcherEvent};
use colored::*;
use log::debug;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::WatchArgs;
use crate::error::CliError;

/// Run the watch command: stream events until Ctrl+C.
pub async fn run_watch(args: WatchArgs, port: u16, json: bool) -> Result<(), CliError> {
    let watcher = BeaconWatcher::new(UdpBeaconSource::new(port));
    watcher.set_heartbeat_timeout(Duration::from_secs(args.timeout));

    // Subscribe before starting so the Started notification is not missed
    let mut events = watcher.subscribe();
    watcher.start_listening()?;

    if !json {
        println!(
            "Watching for beacons on UDP port {} (press Ctrl+C to stop)...\n",
            port
        );
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                watcher.stop_listening();
                // Keep draining until the source acknowledges the stop
            }
            event = events.recv() => match event {
                Ok(event) => {
                    let stopped = matches!(event, WatcherEvent::Stopped);
                    print_event(&event, json);
                    if stopped {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("warning: fell behind, dropped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    Ok(())
}

fn print_event(event: &WatcherEvent, json: bool) {
    if json {
        let line = match event {
            WatcherEvent::Started => serde_json::json!({"event": "started"}),
            WatcherEvent::Stopped => serde_json::json!({"event": "stopped"}),
            WatcherEvent::DeviceDiscovered(r) => {
                serde_json::json!({"event": "discovered", "device": r})
            }
            WatcherEvent::NewDeviceDiscovered(r) => {
                serde_json::json!({"event": "new-device", "device": r})
            }
            WatcherEvent::DeviceNameChanged(r) => {
                serde_json::json!({"event": "name-changed", "device": r})
            }
            WatcherEvent::DeviceTimeout(r) => {
                serde_json::json!({"event": "timeout", "device": r})
            }
        };
        println!("{}", line);
        return;
    }

    match event {
        WatcherEvent::Started => println!("{}", "Started listening".bold()),
        WatcherEvent::Stopped => println!("{}", "Stopped listening".bold()),
        // Fires for every heartbeat; too chatty for the default view
        WatcherEvent::DeviceDiscovered(record) => debug!("heard {}", record),
        WatcherEvent::NewDeviceDiscovered(record) => {
            println!("{}", format!("New beacon: {}", record).green())
        }
        WatcherEvent::DeviceNameChanged(record) => {
            println!("{}", format!("Name changed: {}", record).yellow())
        }
        WatcherEvent::DeviceTimeout(record) => {
            println!("{}", format!("Timed out: {}", record).red())
        }
    }
}
