//! Concurrency-safe registry of discovered beacons.
//!
//! Single source of truth for currently known, non-stale devices. The map is
//! never exposed; every operation is atomic under one internal lock, which is
//! held only for in-memory map work (callers fire notifications after the
//! lock is released).

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::record::DeviceRecord;

/// Outcome of a single [`DeviceRegistry::upsert`].
#[derive(Debug, Clone)]
pub struct DeviceUpdate {
    /// The record now stored for the address
    pub record: DeviceRecord,
    /// The address was not previously present
    pub is_new: bool,
    /// A non-empty incoming name differed from the stored one
    pub renamed: bool,
}

/// Result of a combined sweep-and-copy read.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    /// Records evicted by the sweep that preceded the copy
    pub evicted: Vec<DeviceRecord>,
    /// Surviving records, sorted by address
    pub devices: Vec<DeviceRecord>,
}

/// Keyed store of [`DeviceRecord`]s with stale-record eviction.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: Mutex<HashMap<u64, DeviceRecord>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or replace the record for `address`.
    ///
    /// Classification happens before the overwrite: `is_new` when the address
    /// was absent, `renamed` when a non-empty incoming name differs from the
    /// stored one. A blank incoming name keeps the previously learned name so
    /// broadcasts that omit the name field cannot erase it. Out-of-order
    /// timestamps are accepted and overwrite unconditionally.
    pub fn upsert(
        &self,
        address: u64,
        name: &str,
        signal_strength: i16,
        broadcast_time: DateTime<Utc>,
    ) -> DeviceUpdate {
        let mut devices = self.devices.lock();

        let previous = devices.get(&address);
        let is_new = previous.is_none();
        let renamed = previous.is_some_and(|prior| !name.is_empty() && prior.name != name);

        let name = match previous {
            Some(prior) if name.is_empty() => prior.name.clone(),
            _ => name.to_string(),
        };

        let record = DeviceRecord {
            address,
            name,
            signal_strength,
            broadcast_time,
        };
        devices.insert(address, record.clone());

        DeviceUpdate {
            record,
            is_new,
            renamed,
        }
    }

    /// Remove every record older than `now - timeout` and return the evicted
    /// records, each exactly once.
    pub fn sweep(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<DeviceRecord> {
        let mut devices = self.devices.lock();
        Self::sweep_locked(&mut devices, now, timeout)
    }

    /// Sweep, then copy the survivors, under a single lock acquisition.
    ///
    /// The returned collection is independent of later mutations.
    pub fn snapshot(&self, now: DateTime<Utc>, timeout: Duration) -> RegistrySnapshot {
        let mut devices = self.devices.lock();
        let evicted = Self::sweep_locked(&mut devices, now, timeout);

        let mut list: Vec<DeviceRecord> = devices.values().cloned().collect();
        // Sort by address for stable output ordering
        list.sort_by_key(|record| record.address);

        RegistrySnapshot {
            evicted,
            devices: list,
        }
    }

    /// Remove all records. Used when the watcher stops.
    pub fn clear(&self) {
        self.devices.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_locked(
        devices: &mut HashMap<u64, DeviceRecord>,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Vec<DeviceRecord> {
        let age = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);
        let Some(threshold) = now.checked_sub_signed(age) else {
            // Timeout reaches before the representable epoch, nothing is stale.
            return Vec::new();
        };

        let stale: Vec<u64> = devices
            .values()
            .filter(|record| record.broadcast_time < threshold)
            .map(|record| record.address)
            .collect();

        stale
            .into_iter()
            .filter_map(|address| devices.remove(&address))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn test_first_upsert_is_new() {
        let registry = DeviceRegistry::new();
        let update = registry.upsert(100, "Alice", -50, Utc::now());

        assert!(update.is_new);
        assert!(!update.renamed);
        assert_eq!(update.record.name, "Alice");
    }

    #[test]
    fn test_upserts_deduplicate_by_address() {
        let registry = DeviceRegistry::new();
        let now = Utc::now();

        registry.upsert(100, "Alice", -50, now);
        registry.upsert(100, "Alice", -72, now + TimeDelta::seconds(1));
        registry.upsert(200, "Bob", -60, now);

        assert_eq!(registry.len(), 2);

        let snapshot = registry.snapshot(now + TimeDelta::seconds(1), TIMEOUT);
        assert_eq!(snapshot.devices[0].address, 100);
        assert_eq!(snapshot.devices[0].signal_strength, -72);
    }

    #[test]
    fn test_rename_detection() {
        let registry = DeviceRegistry::new();
        let now = Utc::now();

        registry.upsert(100, "Foo", -50, now);
        let update = registry.upsert(100, "Bar", -50, now + TimeDelta::seconds(1));

        assert!(!update.is_new);
        assert!(update.renamed);
        assert_eq!(update.record.name, "Bar");
    }

    #[test]
    fn test_same_name_is_not_a_rename() {
        let registry = DeviceRegistry::new();
        let now = Utc::now();

        registry.upsert(100, "Foo", -50, now);
        let update = registry.upsert(100, "Foo", -55, now + TimeDelta::seconds(1));

        assert!(!update.renamed);
    }

    #[test]
    fn test_blank_name_keeps_previous_name() {
        let registry = DeviceRegistry::new();
        let t1 = Utc::now();
        let t2 = t1 + TimeDelta::seconds(5);

        registry.upsert(100, "Foo", -50, t1);
        let update = registry.upsert(100, "", -48, t2);

        assert!(!update.is_new);
        assert!(!update.renamed);
        assert_eq!(update.record.name, "Foo");
        assert_eq!(update.record.broadcast_time, t2);
    }

    #[test]
    fn test_sweep_evicts_only_stale_records() {
        let registry = DeviceRegistry::new();
        let now = Utc::now();

        registry.upsert(1, "old", -40, now - TimeDelta::seconds(31));
        registry.upsert(2, "fresh", -40, now - TimeDelta::seconds(29));

        let evicted = registry.sweep(now, TIMEOUT);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].address, 1);
        assert_eq!(registry.len(), 1);

        // A second pass finds nothing left to evict
        assert!(registry.sweep(now, TIMEOUT).is_empty());
    }

    #[test]
    fn test_snapshot_sweeps_and_sorts() {
        let registry = DeviceRegistry::new();
        let now = Utc::now();

        registry.upsert(30, "c", -40, now);
        registry.upsert(10, "a", -40, now);
        registry.upsert(20, "stale", -40, now - TimeDelta::seconds(60));

        let snapshot = registry.snapshot(now, TIMEOUT);
        assert_eq!(snapshot.evicted.len(), 1);
        assert_eq!(snapshot.evicted[0].address, 20);

        let addresses: Vec<u64> = snapshot.devices.iter().map(|d| d.address).collect();
        assert_eq!(addresses, vec![10, 30]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let registry = DeviceRegistry::new();
        let now = Utc::now();

        registry.upsert(100, "Alice", -50, now);
        let snapshot = registry.snapshot(now, TIMEOUT);

        registry.upsert(100, "Renamed", -50, now + TimeDelta::seconds(1));
        registry.clear();

        assert_eq!(snapshot.devices.len(), 1);
        assert_eq!(snapshot.devices[0].name, "Alice");
    }

    #[test]
    fn test_clear_removes_everything() {
        let registry = DeviceRegistry::new();
        registry.upsert(1, "a", -40, Utc::now());
        registry.upsert(2, "b", -40, Utc::now());

        registry.clear();
        assert!(registry.is_empty());
    }
}
