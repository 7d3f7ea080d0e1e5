pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{
    Config, ConfigIssue, HistoryBackend, HistoryConfig, ServicesConfig, ValidationResult,
    WeatherConfig,
};
pub use error::{AppError, ConfigError};

// Re-exported for front ends
pub use dss_history::{HistoryLog, HistoryRecord};
pub use dss_services::{Diagnosis, RiskAssessment, RiskForm};
pub use dss_weather::{AdviceTier, CurrentReading, DayAdvisory, FetchStage, Located, LocatedQuery};

use anyhow::Result;

/// Initialize logging for the DSS client
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("DSS core initialized");
    Ok(())
}
