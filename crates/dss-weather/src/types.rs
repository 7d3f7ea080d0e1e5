use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reference location used when the device position is unknown (Cuenca, Ecuador).
pub const FALLBACK_LATITUDE: f64 = -2.9001;
pub const FALLBACK_LONGITUDE: f64 = -79.0059;

/// Number of forecast days read from the daily series.
pub const FORECAST_DAYS: usize = 5;

/// Position reported by a location provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

/// Coordinate a single fetch is made against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocatedQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub is_fallback_location: bool,
}

impl LocatedQuery {
    /// A coordinate obtained from the location provider.
    pub fn resolved(location: &Location) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            is_fallback_location: false,
        }
    }

    /// The reference coordinate, flagged as a fallback.
    pub fn fallback(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            is_fallback_location: true,
        }
    }

    /// Notice to show the user when data comes from the reference location.
    pub fn fallback_notice(&self) -> Option<&'static str> {
        self.is_fallback_location.then_some(
            "Could not detect your exact location. Using reference data (Ecuador).",
        )
    }
}

/// Data fetched for a resolved coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    pub query: LocatedQuery,
    pub data: T,
}

/// Current conditions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentReading {
    /// Air temperature at 2 m, °C.
    pub temperature: f64,
    /// Relative humidity at 2 m, %.
    pub humidity: f64,
    /// Rain over the preceding interval, mm.
    pub rain: f64,
}

impl CurrentReading {
    pub fn is_raining(&self) -> bool {
        self.rain > 0.0
    }
}

/// One day of the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    /// °C; `None` when the series has a gap for this day.
    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    /// Maximum precipitation probability for the day, %.
    pub rain_probability: f64,
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API returned status {status}")]
    Api { status: u16 },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::Api { .. } => {
                "Could not get weather data. Check your connection."
            }
            Self::Parse(_) => "Weather service returned unexpected data.",
        }
    }
}
