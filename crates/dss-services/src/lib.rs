//! Remote DSS backend: leaf diagnosis and blight risk.

pub mod client;
pub mod error;
pub mod risk_form;
pub mod types;

pub use client::{DssClient, DEFAULT_API_URL};
pub use error::{ServiceError, ValidationError};
pub use risk_form::RiskForm;
pub use types::{Diagnosis, RiskAssessment, RiskRequest, DARK_TEXT_COLOR, LIGHT_TEXT_COLOR};
