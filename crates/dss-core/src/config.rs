use anyhow::{Context, Result};
use dss_history::{ThumbnailOptions, DEFAULT_CAPACITY_BYTES};
use dss_weather::location::DEFAULT_LOCATION_TIMEOUT_SECS;
use dss_weather::provider::OPEN_METEO_URL;
use dss_weather::{LocateOptions, FALLBACK_LATITUDE, FALLBACK_LONGITUDE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// One problem found in a config field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

/// Problems found by [`Config::validate`]; only errors make a config unusable.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ConfigIssue {
            field,
            message: message.into(),
        });
    }

    fn warn(&mut self, field: &'static str, message: impl Into<String>) {
        self.warnings.push(ConfigIssue {
            field,
            message: message.into(),
        });
    }

    /// All errors joined with `; `.
    pub fn error_summary(&self) -> String {
        let issues: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        issues.join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default)]
    pub services: ServicesConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the diagnosis and risk backend
    pub api_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            api_url: dss_services::DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Open-Meteo compatible forecast endpoint
    pub forecast_url: String,

    /// How long to wait for a device position
    pub location_timeout_secs: u64,

    pub fallback_latitude: f64,
    pub fallback_longitude: f64,

    /// Fixed position used instead of the device location. Both must be set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: OPEN_METEO_URL.to_string(),
            location_timeout_secs: DEFAULT_LOCATION_TIMEOUT_SECS,
            fallback_latitude: FALLBACK_LATITUDE,
            fallback_longitude: FALLBACK_LONGITUDE,
            latitude: None,
            longitude: None,
        }
    }
}

impl WeatherConfig {
    /// Configured position, when both coordinates are present.
    pub fn configured_position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn locate_options(&self) -> LocateOptions {
        LocateOptions {
            timeout: Duration::from_secs(self.location_timeout_secs),
            fallback_latitude: self.fallback_latitude,
            fallback_longitude: self.fallback_longitude,
            ..LocateOptions::default()
        }
    }
}

/// Where diagnosis history is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Sqlite,
    /// Lost on exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub backend: HistoryBackend,

    /// SQLite file; defaults to `history.db` in the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Storage quota for the serialized history log
    pub capacity_bytes: usize,

    pub thumbnail_max_width: u32,

    /// JPEG quality, 1-100
    pub thumbnail_quality: u8,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let thumbnail = ThumbnailOptions::default();
        Self {
            backend: HistoryBackend::Sqlite,
            database_path: None,
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            thumbnail_max_width: thumbnail.max_width,
            thumbnail_quality: thumbnail.quality,
        }
    }
}

impl HistoryConfig {
    pub fn thumbnail_options(&self) -> ThumbnailOptions {
        ThumbnailOptions {
            max_width: self.thumbnail_max_width,
            quality: self.thumbnail_quality,
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dss")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            services: ServicesConfig::default(),
            weather: WeatherConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.services.api_url, "services.api_url", &mut result);
        validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);

        if self.weather.location_timeout_secs == 0 {
            result.warn(
                "weather.location_timeout_secs",
                "Location timeout is 0; the fallback location will always be used",
            );
        }

        validate_coordinate(
            Some(self.weather.fallback_latitude),
            90.0,
            "weather.fallback_latitude",
            &mut result,
        );
        validate_coordinate(
            Some(self.weather.fallback_longitude),
            180.0,
            "weather.fallback_longitude",
            &mut result,
        );
        validate_coordinate(self.weather.latitude, 90.0, "weather.latitude", &mut result);
        validate_coordinate(self.weather.longitude, 180.0, "weather.longitude", &mut result);

        if self.weather.latitude.is_some() != self.weather.longitude.is_some() {
            result.warn(
                "weather",
                "Only one of latitude/longitude is set; the configured position is ignored",
            );
        }

        if self.history.capacity_bytes == 0 {
            result.error("history.capacity_bytes", "Capacity must be greater than 0");
        }
        if self.history.thumbnail_max_width == 0 {
            result.error(
                "history.thumbnail_max_width",
                "Thumbnail width must be greater than 0",
            );
        }
        if !(1..=100).contains(&self.history.thumbnail_quality) {
            result.error(
                "history.thumbnail_quality",
                format!(
                    "Quality must be between 1 and 100, got: {}",
                    self.history.thumbnail_quality
                ),
            );
        }

        result
    }

    /// SQLite history file
    pub fn database_path(&self) -> PathBuf {
        self.history
            .database_path
            .clone()
            .unwrap_or_else(|| self.config_dir.join("history.db"))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("dss");

        Ok(config_dir.join("config.toml"))
    }
}

fn validate_url(url_str: &str, field_name: &'static str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.error(field_name, "URL must have a host");
            }

            if url.port() == Some(0) {
                result.error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

fn validate_coordinate(
    value: Option<f64>,
    limit: f64,
    field: &'static str,
    result: &mut ValidationResult,
) {
    if let Some(v) = value {
        if !v.is_finite() || v.abs() > limit {
            result.error(field, format!("Must be between -{limit} and {limit}, got: {v}"));
        }
    }
}
