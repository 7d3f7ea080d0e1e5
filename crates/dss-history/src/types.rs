use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Storage key holding the serialized history log.
pub const HISTORY_KEY: &str = "dss_history";

/// Format used for the human-readable creation time of a record.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Diagnosis fields kept in history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisSummary {
    pub diagnosis: String,
    pub risk: String,
}

impl DiagnosisSummary {
    pub fn new(diagnosis: impl Into<String>, risk: impl Into<String>) -> Self {
        Self {
            diagnosis: diagnosis.into(),
            risk: risk.into(),
        }
    }
}

/// A saved diagnosis.
///
/// Serialized with the same keys the web client used for its local storage,
/// so existing history blobs stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Creation time in Unix milliseconds; also the identity and sort key.
    pub id: i64,
    #[serde(rename = "date")]
    pub display_timestamp: String,
    /// JPEG data URL (`data:image/jpeg;base64,...`).
    #[serde(rename = "image")]
    pub thumbnail: String,
    #[serde(rename = "diagnostico")]
    pub diagnosis: String,
    #[serde(rename = "riesgo")]
    pub risk_level: String,
}

impl HistoryRecord {
    /// Build a record created at `now`, with an id strictly greater than `newest_id`.
    ///
    /// Returns `None` when `newest_id` is already `i64::MAX`.
    pub fn new(
        now: DateTime<Utc>,
        newest_id: Option<i64>,
        thumbnail: String,
        summary: &DiagnosisSummary,
    ) -> Option<Self> {
        Some(Self {
            id: next_id(now.timestamp_millis(), newest_id)?,
            display_timestamp: now
                .with_timezone(&Local)
                .format(DISPLAY_TIMESTAMP_FORMAT)
                .to_string(),
            thumbnail,
            diagnosis: summary.diagnosis.clone(),
            risk_level: summary.risk.clone(),
        })
    }
}

/// Newest-first sequence of records.
pub type HistoryLog = Vec<HistoryRecord>;

/// Result of writing a log through the eviction loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The log was written after dropping `evicted` of the oldest records.
    Saved { kept: usize, evicted: usize },
    /// Even a single record did not fit; nothing was written.
    Abandoned { evicted: usize },
}

impl PersistOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Millisecond clock value, bumped past the newest id when the clock has not moved.
fn next_id(now_millis: i64, newest_id: Option<i64>) -> Option<i64> {
    match newest_id {
        Some(newest) if now_millis <= newest => newest.checked_add(1),
        _ => Some(now_millis),
    }
}
