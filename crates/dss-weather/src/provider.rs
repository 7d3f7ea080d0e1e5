//! Open-Meteo client for current conditions and the daily forecast.
//! Free, no API key required.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{CurrentReading, ForecastDay, LocatedQuery, WeatherError, FORECAST_DAYS};

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const REQUEST_TIMEOUT_SECS: u64 = 10;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,rain";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_probability_max";

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    rain: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_probability_max: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherProvider {
    /// Client for the public Open-Meteo endpoint.
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(OPEN_METEO_URL)
    }

    /// Client for an Open-Meteo compatible forecast endpoint at `base_url`.
    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.to_string(),
        })
    }

    /// Fetch current temperature, humidity and rain.
    #[instrument(skip(self), level = "info")]
    pub async fn current(&self, query: LocatedQuery) -> Result<CurrentReading, WeatherError> {
        let body: CurrentResponse = self.get(query, &[("current", CURRENT_FIELDS)]).await?;
        Ok(CurrentReading {
            temperature: body.current.temperature_2m,
            humidity: body.current.relative_humidity_2m,
            rain: body.current.rain,
        })
    }

    /// Fetch the next [`FORECAST_DAYS`] days.
    #[instrument(skip(self), level = "info")]
    pub async fn forecast(&self, query: LocatedQuery) -> Result<Vec<ForecastDay>, WeatherError> {
        let body: ForecastResponse = self.get(query, &[("daily", DAILY_FIELDS)]).await?;
        parse_daily(body.daily)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        query: LocatedQuery,
        fields: &[(&str, &str)],
    ) -> Result<T, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", query.latitude.to_string()),
                ("longitude", query.longitude.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .query(fields)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Weather API returned status {}", status);
            return Err(WeatherError::Api {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))
    }
}

/// Zip the parallel daily series into days.
///
/// Missing probabilities read as 0; missing temperatures stay `None`.
fn parse_daily(daily: DailyBlock) -> Result<Vec<ForecastDay>, WeatherError> {
    let available = daily
        .time
        .len()
        .min(daily.temperature_2m_max.len())
        .min(daily.temperature_2m_min.len())
        .min(daily.precipitation_probability_max.len());
    if available < FORECAST_DAYS {
        tracing::warn!(
            "Forecast has {} complete days, expected {}",
            available,
            FORECAST_DAYS
        );
    }

    (0..available.min(FORECAST_DAYS))
        .map(|i| {
            let date = NaiveDate::parse_from_str(&daily.time[i], "%Y-%m-%d")
                .map_err(|e| WeatherError::Parse(format!("bad date {:?}: {}", daily.time[i], e)))?;
            Ok(ForecastDay {
                date,
                max_temperature: daily.temperature_2m_max[i],
                min_temperature: daily.temperature_2m_min[i],
                rain_probability: daily.precipitation_probability_max[i].unwrap_or(0.0),
            })
        })
        .collect()
}
