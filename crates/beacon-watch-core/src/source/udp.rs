//! UDP advertisement source.
//!
//! Beacons announce themselves with small JSON datagrams broadcast on a
//! well-known port. Uses SO_REUSEPORT so several listeners can coexist on
//! the same machine.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Advertisement, AdvertisementSource, SourceEvent};
use crate::error::{AdvertisementError, WatchError};

/// Default UDP port beacons broadcast on
pub const BEACON_PORT: u16 = 3331;

/// Create a UDP socket with SO_REUSEPORT for concurrent operation.
pub fn create_reusable_socket(port: u16) -> Result<std::net::UdpSocket, std::io::Error> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;

    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    socket.bind(&addr.into())?;

    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// Parse a beacon advertisement datagram.
///
/// Expected fields: `addr` (required), `name` and `rssi` (optional).
/// Standalone so it can be tested without a socket.
pub fn parse_advertisement(
    data: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<Advertisement, AdvertisementError> {
    let json: serde_json::Value = serde_json::from_slice(data)?;

    let address = json["addr"]
        .as_u64()
        .ok_or(AdvertisementError::MissingAddress)?;

    // Out-of-range RSSI values saturate rather than wrap
    let signal_strength = json["rssi"]
        .as_i64()
        .unwrap_or(0)
        .clamp(i16::MIN as i64, i16::MAX as i64) as i16;

    Ok(Advertisement {
        address,
        local_name: json["name"].as_str().unwrap_or("").to_string(),
        signal_strength,
        timestamp,
    })
}

/// Advertisement source listening for beacon datagrams on UDP.
pub struct UdpBeaconSource {
    port: u16,
    cancel: Option<CancellationToken>,
}

impl UdpBeaconSource {
    pub fn new(port: u16) -> Self {
        Self { port, cancel: None }
    }

    /// The port the source listens on. A port of 0 is resolved to the
    /// actual bound port once the source has started.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for UdpBeaconSource {
    fn default() -> Self {
        Self::new(BEACON_PORT)
    }
}

impl AdvertisementSource for UdpBeaconSource {
    fn start(&mut self, events: mpsc::Sender<SourceEvent>) -> Result<(), WatchError> {
        let socket = create_reusable_socket(self.port)?;
        self.port = socket.local_addr()?.port();

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        tokio::spawn(run_scan(socket, events, cancel));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

/// Receive loop: forward parsed advertisements until cancelled, then
/// acknowledge with [`SourceEvent::Stopped`].
async fn run_scan(
    socket: std::net::UdpSocket,
    events: mpsc::Sender<SourceEvent>,
    cancel: CancellationToken,
) {
    let socket = match UdpSocket::from_std(socket) {
        Ok(socket) => socket,
        Err(e) => {
            warn!("failed to register beacon socket with the runtime: {}", e);
            let _ = events.send(SourceEvent::Stopped).await;
            return;
        }
    };

    let mut buf = vec![0u8; 1024];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, addr)) => match parse_advertisement(&buf[..len], Utc::now()) {
                    Ok(advertisement) => {
                        if events
                            .send(SourceEvent::Advertisement(advertisement))
                            .await
                            .is_err()
                        {
                            // Watcher went away
                            break;
                        }
                    }
                    Err(e) => debug!("ignoring malformed datagram from {}: {}", addr, e),
                },
                Err(e) => warn!("UDP receive error: {}", e),
            }
        }
    }

    let _ = events.send(SourceEvent::Stopped).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_advertisement() {
        let data = br#"{"addr": 187723572702975, "name": "Kitchen sensor", "rssi": -67}"#;

        let adv = parse_advertisement(data, Utc::now()).unwrap();

        assert_eq!(adv.address, 0xAABBCCDDEEFF);
        assert_eq!(adv.local_name, "Kitchen sensor");
        assert_eq!(adv.signal_strength, -67);
    }

    #[test]
    fn test_parse_minimal_advertisement() {
        // Name and RSSI may be omitted
        let data = br#"{"addr": 42}"#;

        let adv = parse_advertisement(data, Utc::now()).unwrap();

        assert_eq!(adv.address, 42);
        assert_eq!(adv.local_name, "");
        assert_eq!(adv.signal_strength, 0);
    }

    #[test]
    fn test_parse_advertisement_missing_address() {
        let data = br#"{"name": "nameless"}"#;

        let result = parse_advertisement(data, Utc::now());
        assert!(matches!(result, Err(AdvertisementError::MissingAddress)));
    }

    #[test]
    fn test_parse_advertisement_clamps_out_of_range_rssi() {
        let adv = parse_advertisement(br#"{"addr": 1, "rssi": 65536}"#, Utc::now()).unwrap();
        assert_eq!(adv.signal_strength, i16::MAX);

        let adv = parse_advertisement(br#"{"addr": 1, "rssi": -65536}"#, Utc::now()).unwrap();
        assert_eq!(adv.signal_strength, i16::MIN);
    }

    #[test]
    fn test_parse_advertisement_invalid_json() {
        let result = parse_advertisement(b"not valid json", Utc::now());
        assert!(matches!(result, Err(AdvertisementError::InvalidPayload(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_reusable_socket_allows_concurrent_binds() {
        let first = create_reusable_socket(0).unwrap();
        let port = first.local_addr().unwrap().port();

        let second = create_reusable_socket(port).unwrap();
        assert_eq!(second.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_source_forwards_datagrams_and_acknowledges_stop() {
        // Ephemeral port: the actual port is read back after start
        let mut source = UdpBeaconSource::new(0);
        let (tx, mut rx) = mpsc::channel(8);

        source.start(tx).unwrap();
        let port = source.port();
        assert_ne!(port, 0);

        let sender = std::net::UdpSocket::bind(("127.0.0.1", 0)).unwrap();
        sender
            .send_to(br#"{"addr": 7, "rssi": -40}"#, ("127.0.0.1", port))
            .unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("no event before timeout")
            .expect("channel closed");
        match event {
            SourceEvent::Advertisement(adv) => assert_eq!(adv.address, 7),
            other => panic!("unexpected event: {:?}", other),
        }

        source.stop();
        let event = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("no stop acknowledgment before timeout")
            .expect("channel closed");
        assert!(matches!(event, SourceEvent::Stopped));
    }
}
