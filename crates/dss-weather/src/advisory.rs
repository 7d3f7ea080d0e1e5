//! Spraying advice per forecast day.

use serde::{Deserialize, Serialize};

use crate::types::ForecastDay;

/// Above this precipitation probability (%) spraying is pointless.
pub const NO_SPRAY_RAIN_PROBABILITY: f64 = 50.0;
/// Fungal risk needs a maximum above this temperature (°C)...
pub const FUNGAL_MAX_TEMPERATURE: f64 = 25.0;
/// ...together with a precipitation probability (%) above this.
pub const FUNGAL_RAIN_PROBABILITY: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceTier {
    Warning,
    Danger,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub tier: AdviceTier,
    pub message: &'static str,
}

/// Classify a day from its maximum temperature and rain probability.
///
/// An unknown maximum never counts as warm.
pub fn classify_day(max_temperature: Option<f64>, rain_probability: f64) -> Advisory {
    if rain_probability > NO_SPRAY_RAIN_PROBABILITY {
        Advisory {
            tier: AdviceTier::Warning,
            message: "High rain probability. Do not spray.",
        }
    } else if max_temperature.is_some_and(|t| t > FUNGAL_MAX_TEMPERATURE)
        && rain_probability > FUNGAL_RAIN_PROBABILITY
    {
        Advisory {
            tier: AdviceTier::Danger,
            message: "Fungal risk. Spray today.",
        }
    } else {
        Advisory {
            tier: AdviceTier::Safe,
            message: "Stable conditions.",
        }
    }
}

/// A forecast day with its advice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAdvisory {
    pub day: ForecastDay,
    pub advisory: Advisory,
}

pub fn advise(days: Vec<ForecastDay>) -> Vec<DayAdvisory> {
    days.into_iter()
        .map(|day| DayAdvisory {
            advisory: classify_day(day.max_temperature, day.rain_probability),
            day,
        })
        .collect()
}
