//! Table-formatted output for CLI.

use comfy_table::{Cell, ContentArrangement, Table};

use super::OutputFormatter;
use beacon_watch_core::DeviceRecord;

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_devices(&self, devices: &[DeviceRecord]) -> String {
        if devices.is_empty() {
            return "No beacons found.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Address", "Name", "RSSI", "Last Broadcast"]);

        for device in devices {
            table.add_row(vec![
                Cell::new(device.address_string()),
                Cell::new(device.display_name()),
                Cell::new(format!("{} dBm", device.signal_strength)),
                Cell::new(device.broadcast_time.format("%H:%M:%S%.3f").to_string()),
            ]);
        }

        format!("{}\n\nFound {} beacon(s)", table, devices.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_empty_list() {
        let output = TableOutput::new().format_devices(&[]);
        assert_eq!(output, "No beacons found.");
    }

    #[test]
    fn test_unknown_name_sentinel() {
        let devices = [DeviceRecord {
            address: 0x1122334455,
            name: String::new(),
            signal_strength: -80,
            broadcast_time: Utc::now(),
        }];

        let output = TableOutput::new().format_devices(&devices);
        assert!(output.contains("[unknown]"));
        assert!(output.contains("00:11:22:33:44:55"));
        assert!(output.contains("Found 1 beacon(s)"));
    }
}
