//! Advertisement sources.
//!
//! A source is an opaque producer of raw advertisement events. The watcher
//! only consumes the event stream and issues start/stop commands.

pub mod udp;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::WatchError;

/// One raw advertisement broadcast as reported by a source.
#[derive(Debug, Clone)]
pub struct Advertisement {
    /// Hardware address of the broadcasting beacon
    pub address: u64,
    /// Advertised name; empty when the broadcast omitted it
    pub local_name: String,
    /// Signal strength in dBm
    pub signal_strength: i16,
    /// When the advertisement was observed
    pub timestamp: DateTime<Utc>,
}

/// Events a source delivers to the watcher.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A beacon broadcast was heard
    Advertisement(Advertisement),
    /// The underlying scan halted, either on command or on its own
    Stopped,
}

/// An external producer of advertisement events.
///
/// `stop` is asynchronous in effect: the source acknowledges by sending
/// [`SourceEvent::Stopped`] (or by closing its sender) some time after the
/// call returns.
pub trait AdvertisementSource: Send {
    /// Begin scanning and deliver events through `events`.
    fn start(&mut self, events: mpsc::Sender<SourceEvent>) -> Result<(), WatchError>;

    /// Command the scan to halt.
    fn stop(&mut self);
}
