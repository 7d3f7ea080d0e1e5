//! Error types for diagnosis history.

use thiserror::Error;

/// Errors raised by a [`HistoryStore`](crate::HistoryStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would push the store past its capacity.
    #[error("Storage capacity exceeded: {needed} bytes needed, {capacity} available")]
    CapacityExceeded { needed: usize, capacity: usize },

    /// SQLite failure other than a full database.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Any other backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Whether the failure can be recovered by writing less data.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}

/// Errors from the thumbnail pipeline.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Image has no pixels")]
    Empty,

    #[error("Thumbnail task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors from history operations that are not recovered locally.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] ThumbnailError),

    /// The stored log already holds the largest possible id.
    #[error("No record id above {newest} is available")]
    IdsExhausted { newest: i64 },
}

impl HistoryError {
    /// User-friendly message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Store(_) => "Unable to access saved history.",
            Self::Serialization(_) => "History could not be saved.",
            Self::Thumbnail(_) => "The image could not be processed for history.",
            Self::IdsExhausted { .. } => "History could not be saved.",
        }
    }
}
