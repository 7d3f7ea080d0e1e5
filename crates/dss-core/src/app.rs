use std::sync::Arc;

use dss_history::{
    DiagnosisSummary, HistoryLog, HistoryManager, HistoryStore, MemoryStore, SqliteStore,
};
use dss_services::{Diagnosis, DssClient, RiskAssessment, RiskForm};
use dss_weather::{
    ConfiguredLocation, CurrentReading, DayAdvisory, LocatedFetcher, Located, LocatedQuery,
    LocationProvider, UnavailableLocation, WeatherProvider,
};
use tokio::sync::Mutex;

use crate::config::{Config, HistoryBackend};
use crate::error::{AppError, ConfigError};

type SharedHistory = Mutex<HistoryManager<Box<dyn HistoryStore>>>;

/// Main application state: history, located weather and the DSS backend.
pub struct App {
    config: Arc<Config>,
    history: SharedHistory,
    fetcher: LocatedFetcher,
    client: DssClient,
}

impl App {
    /// Build every component from `config`.
    ///
    /// # Errors
    /// Fails on invalid configuration, an unopenable history database, or an
    /// HTTP client that cannot be built.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        let store: Box<dyn HistoryStore> = match config.history.backend {
            HistoryBackend::Sqlite => {
                let path = config.database_path();
                tracing::info!("Opening history database at {}", path.display());
                Box::new(
                    SqliteStore::new(&path, config.history.capacity_bytes)
                        .map_err(dss_history::HistoryError::from)?,
                )
            }
            HistoryBackend::Memory => {
                tracing::info!("Using in-memory history; it is lost on exit");
                Box::new(MemoryStore::with_capacity(config.history.capacity_bytes))
            }
        };

        let location: Arc<dyn LocationProvider> = match config.weather.configured_position() {
            Some((latitude, longitude)) => Arc::new(ConfiguredLocation::new(latitude, longitude)),
            None => Arc::new(UnavailableLocation),
        };

        Self::from_parts(config, store, location)
    }

    /// Build with an injected history store and location source.
    ///
    /// # Errors
    /// Fails if a configured URL cannot be used for an HTTP client.
    pub fn from_parts(
        config: Config,
        store: Box<dyn HistoryStore>,
        location: Arc<dyn LocationProvider>,
    ) -> Result<Self, AppError> {
        let history = HistoryManager::new(store)
            .with_thumbnail_options(config.history.thumbnail_options());
        let provider = WeatherProvider::with_base_url(&config.weather.forecast_url)?;
        let fetcher = LocatedFetcher::new(location, provider, config.weather.locate_options());
        let client = DssClient::new(&config.services.api_url)?;

        Ok(Self {
            config: Arc::new(config),
            history: Mutex::new(history),
            fetcher,
            client,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Progress of weather requests.
    pub fn fetcher(&self) -> &LocatedFetcher {
        &self.fetcher
    }

    /// Diagnose a leaf image and remember the result.
    ///
    /// History problems are logged and do not affect the returned diagnosis.
    ///
    /// # Errors
    /// Returns the diagnosis endpoint failure.
    pub async fn diagnose(&self, image: Vec<u8>, file_name: &str) -> Result<Diagnosis, AppError> {
        let diagnosis = self.client.analyze(image.clone(), file_name).await?;

        let summary = DiagnosisSummary::new(diagnosis.diagnosis.clone(), diagnosis.risk.clone());
        self.history
            .lock()
            .await
            .record_diagnosis(image, &summary)
            .await;

        Ok(diagnosis)
    }

    /// Saved diagnoses, newest first.
    pub async fn history(&self) -> HistoryLog {
        self.history.lock().await.renderable_history()
    }

    /// Clear all saved diagnoses if `confirm` agrees.
    ///
    /// # Errors
    /// Returns an error if the store cannot delete the log.
    pub async fn clear_history(&self, confirm: impl FnOnce() -> bool) -> Result<bool, AppError> {
        Ok(self.history.lock().await.clear_history(confirm)?)
    }

    /// Current conditions at the device (or fallback) location.
    ///
    /// # Errors
    /// Returns the weather endpoint failure.
    pub async fn current_conditions(&self) -> Result<Located<CurrentReading>, AppError> {
        Ok(self.fetcher.current_conditions().await?)
    }

    /// Overwrite the weather fields of `form` with current conditions.
    ///
    /// `form` is untouched when the fetch fails.
    ///
    /// # Errors
    /// Returns the weather endpoint failure.
    pub async fn fill_risk_form(&self, form: &mut RiskForm) -> Result<LocatedQuery, AppError> {
        let located = self.current_conditions().await?;
        let reading = located.data;
        form.apply_reading(reading.temperature, reading.humidity, reading.is_raining());
        Ok(located.query)
    }

    /// Validate `form` and ask the backend for the blight risk.
    ///
    /// # Errors
    /// Validation failures (no request is made) and endpoint failures.
    pub async fn calculate_risk(&self, form: &RiskForm) -> Result<RiskAssessment, AppError> {
        Ok(self.client.calculate_risk_form(form).await?)
    }

    /// Five-day forecast with spraying advice.
    ///
    /// # Errors
    /// Returns the weather endpoint failure.
    pub async fn forecast(&self) -> Result<Located<Vec<DayAdvisory>>, AppError> {
        Ok(self.fetcher.forecast().await?)
    }
}
