//! Device location and the fallback to the reference coordinate.

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{LocatedQuery, Location, LocationError, FALLBACK_LATITUDE, FALLBACK_LONGITUDE};

pub const DEFAULT_LOCATION_TIMEOUT_SECS: u64 = 10;

/// How a position is requested and where to fall back to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocateOptions {
    pub timeout: Duration,
    pub high_accuracy: bool,
    pub fallback_latitude: f64,
    pub fallback_longitude: f64,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_LOCATION_TIMEOUT_SECS),
            high_accuracy: false,
            fallback_latitude: FALLBACK_LATITUDE,
            fallback_longitude: FALLBACK_LONGITUDE,
        }
    }
}

impl LocateOptions {
    pub fn fallback_query(&self) -> LocatedQuery {
        LocatedQuery::fallback(self.fallback_latitude, self.fallback_longitude)
    }
}

/// Source of the device position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Whether the platform offers location at all.
    fn is_available(&self) -> bool;

    /// Request the current position. The caller bounds this with a timeout.
    async fn current_position(&self, high_accuracy: bool) -> Result<Location, LocationError>;
}

/// Platform without a location service.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLocation;

#[async_trait]
impl LocationProvider for UnavailableLocation {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_position(&self, _high_accuracy: bool) -> Result<Location, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// Fixed position, e.g. a field location set in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredLocation {
    location: Location,
}

impl ConfiguredLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            location: Location {
                latitude,
                longitude,
                accuracy_meters: None,
            },
        }
    }
}

#[async_trait]
impl LocationProvider for ConfiguredLocation {
    fn is_available(&self) -> bool {
        true
    }

    async fn current_position(&self, _high_accuracy: bool) -> Result<Location, LocationError> {
        Ok(self.location.clone())
    }
}

/// Resolve the coordinate to query: the device position if it can be had
/// within the timeout, otherwise the flagged fallback. Never fails.
pub async fn resolve_location(
    provider: &dyn LocationProvider,
    options: &LocateOptions,
) -> LocatedQuery {
    if !provider.is_available() {
        tracing::info!("Location service not available, using fallback coordinate");
        return options.fallback_query();
    }

    let request = provider.current_position(options.high_accuracy);
    let result = match tokio::time::timeout(options.timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout),
    };

    match result {
        Ok(location) => {
            tracing::info!("Got location: {}, {}", location.latitude, location.longitude);
            LocatedQuery::resolved(&location)
        }
        Err(e) => {
            tracing::warn!("Location failed ({}), using fallback coordinate", e);
            options.fallback_query()
        }
    }
}
