//! Diagnosis history for the DSS client.
//!
//! Keeps a newest-first log of past diagnoses, each with a small JPEG
//! thumbnail, under a hard storage quota. Oldest records are evicted when the
//! store reports it is full.

pub mod error;
pub mod manager;
pub mod sqlite;
pub mod store;
pub mod thumbnail;
pub mod types;

pub use error::{HistoryError, StoreError, ThumbnailError};
pub use manager::HistoryManager;
pub use sqlite::SqliteStore;
pub use store::{HistoryStore, MemoryStore, StoreResult, DEFAULT_CAPACITY_BYTES};
pub use thumbnail::{create_thumbnail, render_thumbnail, Thumbnail, ThumbnailOptions};
pub use types::*;
