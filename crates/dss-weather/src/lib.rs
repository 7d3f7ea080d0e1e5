//! Weather for the DSS client
//!
//! Resolves a coordinate from the device location (falling back to a
//! reference location), then reads current conditions or the five-day
//! forecast from Open-Meteo and derives spraying advice.

pub mod advisory;
pub mod fetcher;
pub mod location;
pub mod provider;
pub mod types;

pub use advisory::{advise, classify_day, AdviceTier, Advisory, DayAdvisory};
pub use fetcher::{FetchStage, LocatedFetcher};
pub use location::{
    resolve_location, ConfiguredLocation, LocateOptions, LocationProvider, UnavailableLocation,
};
pub use provider::WeatherProvider;
pub use types::*;
