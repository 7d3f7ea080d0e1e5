//! History cache manager: newest-first diagnosis log kept under a storage quota.
//!
//! Every write stores the whole log under [`HISTORY_KEY`]. When the store
//! rejects a write for capacity, the oldest record is dropped and the write is
//! retried. The newest record is never dropped on purpose: if it does not fit
//! on its own, the write is abandoned and the stored log is left as it was.

use chrono::{DateTime, Utc};

use crate::error::{HistoryError, StoreError};
use crate::store::HistoryStore;
use crate::thumbnail::{create_thumbnail, ThumbnailOptions};
use crate::types::{DiagnosisSummary, HistoryLog, HistoryRecord, PersistOutcome, HISTORY_KEY};

pub struct HistoryManager<S> {
    store: S,
    thumbnail: ThumbnailOptions,
}

impl<S: HistoryStore> HistoryManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            thumbnail: ThumbnailOptions::default(),
        }
    }

    pub fn with_thumbnail_options(mut self, options: ThumbnailOptions) -> Self {
        self.thumbnail = options;
        self
    }

    pub fn thumbnail_options(&self) -> ThumbnailOptions {
        self.thumbnail
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Save a diagnosis with a thumbnail of `image`.
    ///
    /// Never fails: history is secondary to the diagnosis itself, so errors are
    /// logged and dropped.
    pub async fn record_diagnosis(&mut self, image: Vec<u8>, result: &DiagnosisSummary) {
        match self.try_record_diagnosis(image, result).await {
            Ok(PersistOutcome::Saved { kept, evicted }) => {
                tracing::info!(
                    "Saved diagnosis to history ({} records, {} evicted)",
                    kept,
                    evicted
                );
            }
            Ok(PersistOutcome::Abandoned { .. }) => {
                tracing::error!("Diagnosis not saved: history storage is full");
            }
            Err(e) => {
                tracing::error!("Failed to update history: {}", e);
            }
        }
    }

    /// Like [`record_diagnosis`](Self::record_diagnosis), but reports the outcome.
    ///
    /// # Errors
    /// Returns an error if the image cannot be processed, the log cannot be
    /// serialized, or the store fails for a reason other than capacity.
    pub async fn try_record_diagnosis(
        &mut self,
        image: Vec<u8>,
        result: &DiagnosisSummary,
    ) -> Result<PersistOutcome, HistoryError> {
        let thumbnail = create_thumbnail(image, self.thumbnail).await?;
        self.record_at(Utc::now(), thumbnail.to_data_url(), result)
    }

    /// Prepend a record created at `now` with an already-encoded thumbnail and persist.
    ///
    /// # Errors
    /// Same as [`persist_with_eviction`](Self::persist_with_eviction), plus
    /// storage read failures.
    pub fn record_at(
        &mut self,
        now: DateTime<Utc>,
        thumbnail: String,
        result: &DiagnosisSummary,
    ) -> Result<PersistOutcome, HistoryError> {
        let mut log = self.load_for_update()?;
        let newest_id = log.first().map(|r| r.id);
        let record = HistoryRecord::new(now, newest_id, thumbnail, result).ok_or(
            HistoryError::IdsExhausted {
                newest: newest_id.unwrap_or(i64::MAX),
            },
        )?;
        log.insert(0, record);
        self.persist_with_eviction(&mut log)
    }

    /// Write `log`, evicting from the tail while the store reports it full.
    ///
    /// On return `log` holds what was written (or, when abandoned, the single
    /// record that did not fit). Makes at most `log.len()` write attempts.
    ///
    /// # Errors
    /// Serialization failures and non-capacity store failures are returned
    /// immediately without retrying.
    pub fn persist_with_eviction(
        &mut self,
        log: &mut HistoryLog,
    ) -> Result<PersistOutcome, HistoryError> {
        let mut evicted = 0;
        loop {
            let json = serde_json::to_string(&*log)?;
            match self.store.set(HISTORY_KEY, &json) {
                Ok(()) => {
                    return Ok(PersistOutcome::Saved {
                        kept: log.len(),
                        evicted,
                    })
                }
                Err(StoreError::CapacityExceeded { needed, capacity }) if log.len() > 1 => {
                    tracing::warn!(
                        "History storage full ({} > {} bytes), evicting oldest record",
                        needed,
                        capacity
                    );
                    log.pop();
                    evicted += 1;
                }
                Err(StoreError::CapacityExceeded { needed, capacity }) => {
                    tracing::warn!(
                        "Newest record alone does not fit ({} > {} bytes), not saving",
                        needed,
                        capacity
                    );
                    return Ok(PersistOutcome::Abandoned { evicted });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete all history once `confirm` agrees. Returns whether anything was cleared.
    ///
    /// # Errors
    /// Returns an error if the store fails to delete the key.
    pub fn clear_history(&mut self, confirm: impl FnOnce() -> bool) -> Result<bool, HistoryError> {
        if !confirm() {
            tracing::debug!("History clear cancelled");
            return Ok(false);
        }
        self.store.remove(HISTORY_KEY)?;
        tracing::info!("History cleared");
        Ok(true)
    }

    /// The stored log for display; empty when missing or unreadable.
    pub fn renderable_history(&self) -> HistoryLog {
        match self.store.get(HISTORY_KEY) {
            Ok(Some(raw)) => parse_log(&raw).unwrap_or_default(),
            Ok(None) => HistoryLog::new(),
            Err(e) => {
                tracing::warn!("Could not read history: {}", e);
                HistoryLog::new()
            }
        }
    }

    fn load_for_update(&self) -> Result<HistoryLog, HistoryError> {
        let log = match self.store.get(HISTORY_KEY)? {
            Some(raw) => parse_log(&raw).unwrap_or_default(),
            None => HistoryLog::new(),
        };
        Ok(log)
    }
}

fn parse_log(raw: &str) -> Option<HistoryLog> {
    match serde_json::from_str(raw) {
        Ok(log) => Some(log),
        Err(e) => {
            tracing::warn!("Stored history is corrupt, treating as empty: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreResult};

    const THUMB: &str = "data:image/jpeg;base64,AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn summary(n: usize) -> DiagnosisSummary {
        DiagnosisSummary::new(format!("Diagnosis {}", n), "Bajo")
    }

    /// Serialized size of `count` records made by `record_at` with the same inputs.
    fn log_size(count: usize) -> usize {
        let mut manager = HistoryManager::new(MemoryStore::with_capacity(usize::MAX));
        for i in 0..count {
            manager
                .record_at(at(1_700_000_000_000 + i as i64), THUMB.into(), &summary(i))
                .unwrap();
        }
        manager.store().used_bytes()
    }

    #[derive(Clone, Copy)]
    enum Failure {
        Full,
        Broken,
    }

    /// Store whose writes always fail, counting attempts.
    struct FailingStore {
        failure: Failure,
        attempts: usize,
        value: Option<String>,
    }

    impl FailingStore {
        fn new(failure: Failure, value: Option<String>) -> Self {
            Self {
                failure,
                attempts: 0,
                value,
            }
        }
    }

    impl HistoryStore for FailingStore {
        fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Ok(self.value.clone())
        }

        fn set(&mut self, _key: &str, value: &str) -> StoreResult<()> {
            self.attempts += 1;
            match self.failure {
                Failure::Full => Err(StoreError::CapacityExceeded {
                    needed: value.len(),
                    capacity: 0,
                }),
                Failure::Broken => Err(StoreError::backend("disk error")),
            }
        }

        fn remove(&mut self, _key: &str) -> StoreResult<()> {
            Err(StoreError::backend("disk error"))
        }
    }

    #[test]
    fn test_records_are_newest_first_with_increasing_ids() {
        let mut manager = HistoryManager::new(MemoryStore::new());
        for i in 0..5 {
            manager
                .record_at(at(1_700_000_000_000 + i as i64 * 1000), THUMB.into(), &summary(i))
                .unwrap();
        }

        let log = manager.renderable_history();
        assert_eq!(log.len(), 5);
        assert_eq!(log[0].diagnosis, "Diagnosis 4");
        assert_eq!(log[4].diagnosis, "Diagnosis 0");
        for pair in log.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[test]
    fn test_ids_stay_unique_within_one_millisecond() {
        let mut manager = HistoryManager::new(MemoryStore::new());
        let now = at(1_700_000_000_000);
        for i in 0..3 {
            manager.record_at(now, THUMB.into(), &summary(i)).unwrap();
        }

        let ids: Vec<i64> = manager.renderable_history().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1_700_000_000_002, 1_700_000_000_001, 1_700_000_000_000]);
    }

    #[test]
    fn test_eviction_keeps_newest_records_that_fit() {
        let capacity = log_size(3);
        let mut manager = HistoryManager::new(MemoryStore::with_capacity(capacity));

        let mut last = None;
        for i in 0..6 {
            last = Some(
                manager
                    .record_at(at(1_700_000_000_000 + i as i64), THUMB.into(), &summary(i))
                    .unwrap(),
            );
        }

        assert_eq!(last, Some(PersistOutcome::Saved { kept: 3, evicted: 1 }));
        let log = manager.renderable_history();
        let names: Vec<&str> = log.iter().map(|r| r.diagnosis.as_str()).collect();
        assert_eq!(names, vec!["Diagnosis 5", "Diagnosis 4", "Diagnosis 3"]);
        assert!(manager.store().used_bytes() <= capacity);
    }

    #[test]
    fn test_single_record_that_does_not_fit_is_abandoned() {
        let capacity = log_size(2);
        let mut manager = HistoryManager::new(MemoryStore::with_capacity(capacity));
        manager.record_at(at(1_700_000_000_000), THUMB.into(), &summary(0)).unwrap();
        manager.record_at(at(1_700_000_000_001), THUMB.into(), &summary(1)).unwrap();

        let huge = format!("data:image/jpeg;base64,{}", "A".repeat(capacity));
        let outcome = manager
            .record_at(at(1_700_000_000_002), huge, &summary(2))
            .unwrap();

        assert_eq!(outcome, PersistOutcome::Abandoned { evicted: 2 });
        // Previously stored log is untouched
        let log = manager.renderable_history();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].diagnosis, "Diagnosis 1");
    }

    #[test]
    fn test_eviction_attempts_bounded_by_length() {
        let mut manager = HistoryManager::new(FailingStore::new(Failure::Full, None));
        let mut log: HistoryLog = (0..4)
            .map(|i| HistoryRecord::new(at(1_700_000_000_000 + i), None, THUMB.into(), &summary(0)).unwrap())
            .collect();

        let outcome = manager.persist_with_eviction(&mut log).unwrap();

        assert_eq!(outcome, PersistOutcome::Abandoned { evicted: 3 });
        assert_eq!(manager.store().attempts, 4);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_non_capacity_failure_propagates_immediately() {
        let mut manager = HistoryManager::new(FailingStore::new(Failure::Broken, None));
        let mut log: HistoryLog = (0..4)
            .map(|i| HistoryRecord::new(at(1_700_000_000_000 + i), None, THUMB.into(), &summary(0)).unwrap())
            .collect();

        let err = manager.persist_with_eviction(&mut log).unwrap_err();

        assert!(matches!(err, HistoryError::Store(StoreError::Backend(_))));
        assert_eq!(manager.store().attempts, 1);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_corrupt_history_renders_empty() {
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, "{not json").unwrap();
        let manager = HistoryManager::new(store);
        assert!(manager.renderable_history().is_empty());
    }

    #[test]
    fn test_unreadable_store_renders_empty() {
        struct Unreadable;
        impl HistoryStore for Unreadable {
            fn get(&self, _key: &str) -> StoreResult<Option<String>> {
                Err(StoreError::backend("locked"))
            }
            fn set(&mut self, _key: &str, _value: &str) -> StoreResult<()> {
                Ok(())
            }
            fn remove(&mut self, _key: &str) -> StoreResult<()> {
                Ok(())
            }
        }

        let manager = HistoryManager::new(Unreadable);
        assert!(manager.renderable_history().is_empty());
    }

    #[test]
    fn test_record_over_corrupt_history_replaces_it() {
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, "garbage").unwrap();
        let mut manager = HistoryManager::new(store);

        manager.record_at(at(1_700_000_000_000), THUMB.into(), &summary(0)).unwrap();

        assert_eq!(manager.renderable_history().len(), 1);
    }

    #[test]
    fn test_record_after_max_id_fails_without_touching_log() {
        let seeded = r#"[{"id":9223372036854775807,"date":"01/01/2024 00:00:00","image":"","diagnostico":"Sano","riesgo":"Bajo"}]"#;
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, seeded).unwrap();
        let mut manager = HistoryManager::new(store);

        let err = manager
            .record_at(at(1_700_000_000_000), THUMB.into(), &summary(0))
            .unwrap_err();

        assert!(matches!(err, HistoryError::IdsExhausted { newest: i64::MAX }));
        let log = manager.renderable_history();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, i64::MAX);
    }

    #[tokio::test]
    async fn test_record_diagnosis_swallows_exhausted_ids() {
        let seeded = r#"[{"id":9223372036854775807,"date":"01/01/2024 00:00:00","image":"","diagnostico":"Sano","riesgo":"Bajo"}]"#;
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, seeded).unwrap();
        let mut manager = HistoryManager::new(store);

        manager.record_diagnosis(png(40, 30), &summary(1)).await;

        assert_eq!(manager.renderable_history().len(), 1);
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let mut manager = HistoryManager::new(MemoryStore::new());
        manager.record_at(at(1_700_000_000_000), THUMB.into(), &summary(0)).unwrap();

        assert!(!manager.clear_history(|| false).unwrap());
        assert_eq!(manager.renderable_history().len(), 1);

        assert!(manager.clear_history(|| true).unwrap());
        assert!(manager.renderable_history().is_empty());
        assert!(manager.store().get(HISTORY_KEY).unwrap().is_none());
    }

    #[test]
    fn test_clear_surfaces_store_failure() {
        let mut manager = HistoryManager::new(FailingStore::new(Failure::Broken, None));
        assert!(manager.clear_history(|| true).is_err());
    }

    #[tokio::test]
    async fn test_record_diagnosis_swallows_bad_image() {
        let mut manager = HistoryManager::new(MemoryStore::new());
        manager
            .record_diagnosis(b"definitely not an image".to_vec(), &summary(0))
            .await;
        assert!(manager.renderable_history().is_empty());
    }

    #[tokio::test]
    async fn test_record_diagnosis_swallows_storage_failure() {
        let mut manager = HistoryManager::new(FailingStore::new(Failure::Broken, None));
        manager.record_diagnosis(png(300, 200), &summary(0)).await;
        assert_eq!(manager.store().attempts, 1);
    }

    #[tokio::test]
    async fn test_record_diagnosis_stores_thumbnail() {
        let mut manager = HistoryManager::new(MemoryStore::new());
        manager
            .record_diagnosis(png(300, 200), &DiagnosisSummary::new("Sano", "Bajo"))
            .await;

        let log = manager.renderable_history();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].diagnosis, "Sano");
        assert_eq!(log[0].risk_level, "Bajo");
        assert!(log[0].thumbnail.starts_with("data:image/jpeg;base64,"));
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 120, 40]));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }
}
