//! Core library for tracking nearby beacon devices.
//!
//! Beacons announce themselves with periodic advertisement broadcasts. This
//! crate keeps a deduplicated, heartbeat-pruned registry of everything heard
//! recently and turns the raw broadcast stream into semantic notifications
//! (new beacon, name change, timeout).
//!
//! - [`record`] - immutable snapshot of one observed beacon
//! - [`registry`] - concurrency-safe keyed store with stale-record eviction
//! - [`source`] - advertisement sources, including the UDP listener
//! - [`watcher`] - lifecycle controller and notification fan-out

pub mod error;
pub mod record;
pub mod registry;
pub mod source;
pub mod watcher;

pub use error::{AdvertisementError, Result, WatchError};
pub use record::DeviceRecord;
pub use registry::{DeviceRegistry, DeviceUpdate, RegistrySnapshot};
pub use source::udp::{UdpBeaconSource, BEACON_PORT};
pub use source::{Advertisement, AdvertisementSource, SourceEvent};
pub use watcher::{BeaconWatcher, WatcherEvent, DEFAULT_HEARTBEAT_TIMEOUT};
