//! Immutable device record type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one observed beacon at one point in time.
///
/// Records are never mutated; an update replaces the stored record for an
/// address with a freshly constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Hardware address (primary identifier, registry key)
    pub address: u64,
    /// Advertised name; empty when the beacon has never sent one
    pub name: String,
    /// Last observed signal strength in dBm
    pub signal_strength: i16,
    /// When the advertisement was observed
    pub broadcast_time: DateTime<Utc>,
}

impl DeviceRecord {
    /// Render the address as colon-separated hex octets (48-bit convention).
    pub fn address_string(&self) -> String {
        let octets: Vec<String> = (0..6)
            .rev()
            .map(|shift| format!("{:02X}", (self.address >> (shift * 8)) & 0xFF))
            .collect();
        octets.join(":")
    }

    /// The advertised name, or `"[unknown]"` when none was ever heard.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "[unknown]"
        } else {
            &self.name
        }
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} dBm)",
            self.display_name(),
            self.address_string(),
            self.signal_strength
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> DeviceRecord {
        DeviceRecord {
            address: 0xAABBCCDDEEFF,
            name: name.to_string(),
            signal_strength: -67,
            broadcast_time: Utc::now(),
        }
    }

    #[test]
    fn test_address_string() {
        assert_eq!(record("").address_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_display_with_name() {
        let shown = format!("{}", record("Kitchen sensor"));
        assert_eq!(shown, "Kitchen sensor AA:BB:CC:DD:EE:FF (-67 dBm)");
    }

    #[test]
    fn test_display_without_name() {
        let shown = format!("{}", record(""));
        assert!(shown.starts_with("[unknown]"));
    }

    #[test]
    fn test_serialization_round_trip() {
        let original = record("Tag-7");
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"signalStrength\":-67"));
        assert!(json.contains("\"broadcastTime\":"));

        let parsed: DeviceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(original, parsed);
    }
}
