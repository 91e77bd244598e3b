//! Watcher controller: lifecycle orchestration and notification fan-out.
//!
//! The only component that talks to the advertisement source. Registry
//! results are computed under the registry lock first; notifications are
//! emitted afterwards, so a slow subscriber can never extend the lock-hold
//! time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use crate::error::WatchError;
use crate::record::DeviceRecord;
use crate::registry::DeviceRegistry;
use crate::source::{Advertisement, AdvertisementSource, SourceEvent};

/// Silence duration after which a beacon is considered gone.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the notification fan-out channel. Subscribers that fall
/// further behind lose oldest events rather than blocking the watcher.
const NOTIFY_CAPACITY: usize = 64;

/// Capacity of the source-to-watcher event channel.
const SOURCE_CAPACITY: usize = 64;

/// Semantic notifications emitted by [`BeaconWatcher`].
///
/// Within one advertisement's cascade the order is: timeouts, discovered,
/// name-changed, new-device.
#[derive(Debug, Clone)]
pub enum WatcherEvent {
    /// The watcher began listening
    Started,
    /// The source acknowledged that scanning halted
    Stopped,
    /// A beacon broadcast was processed (fires for every advertisement)
    DeviceDiscovered(DeviceRecord),
    /// The broadcast came from an address not seen before
    NewDeviceDiscovered(DeviceRecord),
    /// A known beacon advertised a different non-empty name
    DeviceNameChanged(DeviceRecord),
    /// A beacon went silent past the heartbeat timeout and was evicted
    DeviceTimeout(DeviceRecord),
}

/// Tracks nearby beacons from an advertisement source.
///
/// Owns the [`DeviceRegistry`], wires it to an [`AdvertisementSource`], and
/// fans notifications out over a broadcast channel. Dropping a receiver
/// unsubscribes it.
pub struct BeaconWatcher {
    inner: Arc<WatcherInner>,
    source: Mutex<Box<dyn AdvertisementSource>>,
}

struct WatcherInner {
    registry: DeviceRegistry,
    heartbeat_timeout_secs: AtomicU64,
    listening: AtomicBool,
    // Incremented per start so a lingering task from a previous session
    // cannot flip `listening` for the current one.
    generation: AtomicU64,
    notify: broadcast::Sender<WatcherEvent>,
}

impl BeaconWatcher {
    pub fn new(source: impl AdvertisementSource + 'static) -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            inner: Arc::new(WatcherInner {
                registry: DeviceRegistry::new(),
                heartbeat_timeout_secs: AtomicU64::new(DEFAULT_HEARTBEAT_TIMEOUT.as_secs()),
                listening: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                notify,
            }),
            source: Mutex::new(Box::new(source)),
        }
    }

    /// Subscribe to watcher notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<WatcherEvent> {
        self.inner.notify.subscribe()
    }

    pub fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::SeqCst)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.inner.heartbeat_timeout_secs.load(Ordering::SeqCst))
    }

    /// Change the heartbeat timeout; effective for all subsequent sweeps.
    pub fn set_heartbeat_timeout(&self, timeout: Duration) {
        self.inner
            .heartbeat_timeout_secs
            .store(timeout.as_secs(), Ordering::SeqCst);
    }

    /// Start listening for advertisements. No-op when already listening.
    pub fn start_listening(&self) -> Result<(), WatchError> {
        if self.inner.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::channel(SOURCE_CAPACITY);

        if let Err(e) = self.source.lock().start(tx) {
            self.inner.listening.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(rx, generation).await });

        self.inner.emit(WatcherEvent::Started);
        Ok(())
    }

    /// Stop listening and clear the registry. No-op when already stopped.
    ///
    /// The [`WatcherEvent::Stopped`] notification follows the source's own
    /// stop acknowledgment and may arrive after this call returns.
    pub fn stop_listening(&self) {
        if !self.inner.listening.swap(false, Ordering::SeqCst) {
            return;
        }

        self.source.lock().stop();
        self.inner.registry.clear();
    }

    /// All currently known, non-stale beacons, sorted by address.
    ///
    /// Reading triggers a sweep, so the call itself can produce
    /// [`WatcherEvent::DeviceTimeout`] notifications.
    pub fn discovered_devices(&self) -> Vec<DeviceRecord> {
        let snapshot = self
            .inner
            .registry
            .snapshot(Utc::now(), self.heartbeat_timeout());

        for record in snapshot.evicted {
            self.inner.emit(WatcherEvent::DeviceTimeout(record));
        }
        snapshot.devices
    }
}

impl WatcherInner {
    /// Process source events one at a time, preserving the source's order.
    async fn run(self: Arc<Self>, mut events: mpsc::Receiver<SourceEvent>, generation: u64) {
        while let Some(event) = events.recv().await {
            match event {
                SourceEvent::Advertisement(advertisement) => {
                    // Events buffered across a stop, or from a superseded
                    // session, must not repopulate the cleared registry.
                    if self.generation.load(Ordering::SeqCst) == generation
                        && self.listening.load(Ordering::SeqCst)
                    {
                        self.handle_advertisement(advertisement);
                    }
                }
                SourceEvent::Stopped => break,
            }
        }

        // Reached on explicit acknowledgment or when the source dropped its
        // sender; either way the scan is over. A superseded session stays
        // silent: its stop acknowledgment belongs to a watcher state that no
        // longer exists.
        if self.generation.load(Ordering::SeqCst) == generation {
            self.listening.store(false, Ordering::SeqCst);
            self.emit(WatcherEvent::Stopped);
        }
    }

    fn handle_advertisement(&self, advertisement: Advertisement) {
        let timeout = Duration::from_secs(self.heartbeat_timeout_secs.load(Ordering::SeqCst));

        // Sweep before the upsert; the incoming record is written afterwards
        // and can never evict itself.
        for expired in self.registry.sweep(Utc::now(), timeout) {
            self.emit(WatcherEvent::DeviceTimeout(expired));
        }

        let update = self.registry.upsert(
            advertisement.address,
            &advertisement.local_name,
            advertisement.signal_strength,
            advertisement.timestamp,
        );

        self.emit(WatcherEvent::DeviceDiscovered(update.record.clone()));
        if update.renamed {
            self.emit(WatcherEvent::DeviceNameChanged(update.record.clone()));
        }
        if update.is_new {
            self.emit(WatcherEvent::NewDeviceDiscovered(update.record));
        }
    }

    fn emit(&self, event: WatcherEvent) {
        // Err means no subscribers right now
        let _ = self.notify.send(event);
    }
}
