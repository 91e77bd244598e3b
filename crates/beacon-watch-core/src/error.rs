//! Error types for beacon-watch core.

use thiserror::Error;

/// Core error type for watcher operations.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Source error: {0}")]
    Source(#[from] std::io::Error),

    #[error("Advertisement error: {0}")]
    Advertisement(#[from] AdvertisementError),
}

/// Errors raised while decoding a raw advertisement datagram.
#[derive(Debug, Error)]
pub enum AdvertisementError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Missing beacon address")]
    MissingAddress,
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, WatchError>;
