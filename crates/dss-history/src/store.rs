//! Key-value storage seam for the history log.
//!
//! The eviction loop only needs to tell a capacity failure apart from any
//! other failure, so backends are reduced to three string operations.

use std::collections::HashMap;

use crate::error::StoreError;

/// Same as a typical browser local storage quota.
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Size-bounded string storage.
pub trait HistoryStore: Send {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    /// Returns `StoreError::CapacityExceeded` when the value does not fit.
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete `key`. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> StoreResult<()>;
}

impl<S: HistoryStore + ?Sized> HistoryStore for Box<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }
}

/// In-memory store with a byte quota over all values.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY_BYTES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    /// Bytes currently used by all values.
    pub fn used_bytes(&self) -> usize {
        self.entries.values().map(String::len).sum()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let others: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        let needed = others + value.len();
        if needed > self.capacity {
            return Err(StoreError::CapacityExceeded {
                needed,
                capacity: self.capacity,
            });
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
