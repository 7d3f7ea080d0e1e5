//! Wire types for the diagnosis and risk endpoints.

use serde::{Deserialize, Serialize};

/// Result of analysing a leaf image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(rename = "diagnostico")]
    pub diagnosis: String,
    #[serde(rename = "riesgo")]
    pub risk: String,
    /// Model probability of disease, 0-1.
    #[serde(rename = "probabilidad_enfermedad")]
    pub disease_probability: f64,
    #[serde(rename = "recomendacion")]
    pub recommendation: String,
}

impl Diagnosis {
    /// Disease probability as a percentage with one decimal, e.g. `"87.5%"`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.disease_probability * 100.0)
    }
}

/// Validated inputs for the risk endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskRequest {
    pub temperature: f64,
    pub humidity: f64,
    pub raining: bool,
    pub hours: f64,
}

/// Risk level as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// CSS colour (named or hex) for the risk banner.
    pub color: String,
    #[serde(rename = "mensaje")]
    pub message: String,
}

/// Dark text colour used on yellow banners.
pub const DARK_TEXT_COLOR: &str = "#283618";
pub const LIGHT_TEXT_COLOR: &str = "white";

impl RiskAssessment {
    /// Text colour that stays readable on [`color`](Self::color).
    pub fn text_color(&self) -> &'static str {
        let color = self.color.trim().to_ascii_lowercase();
        if color == "yellow" || color == "#f1c40f" {
            DARK_TEXT_COLOR
        } else {
            LIGHT_TEXT_COLOR
        }
    }
}
