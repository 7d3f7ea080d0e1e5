//! Editable risk inputs, filled by hand or from current weather.

use crate::error::ValidationError;
use crate::types::RiskRequest;

/// Risk inputs as entered, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskForm {
    pub temperature: String,
    pub humidity: String,
    pub raining: bool,
    pub hours: String,
}

impl RiskForm {
    /// Overwrite the weather fields with a reading; `hours` is left as entered.
    pub fn apply_reading(&mut self, temperature: f64, humidity: f64, raining: bool) {
        self.temperature = temperature.to_string();
        self.humidity = humidity.to_string();
        self.raining = raining;
    }

    /// Parse every numeric field.
    ///
    /// # Errors
    /// Returns the first field (temperature, humidity, hours) that is not a
    /// finite number.
    pub fn validate(&self) -> Result<RiskRequest, ValidationError> {
        Ok(RiskRequest {
            temperature: parse_field(&self.temperature, "temperature")?,
            humidity: parse_field(&self.humidity, "humidity")?,
            raining: self.raining,
            hours: parse_field(&self.hours, "hours")?,
        })
    }
}

fn parse_field(value: &str, field: &'static str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ValidationError::NotANumber(field))
}
