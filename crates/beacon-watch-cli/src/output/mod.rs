//! Output formatting for CLI results.

pub mod json;
pub mod table;

pub use json::JsonOutput;
pub use table::TableOutput;

use beacon_watch_core::DeviceRecord;

/// Output formatter trait
pub trait OutputFormatter {
    /// Format the discovered beacon list
    fn format_devices(&self, devices: &[DeviceRecord]) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}
