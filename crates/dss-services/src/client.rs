//! HTTP client for the DSS backend (`/analizar`, `/calcular-riesgo`).

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::error::ServiceError;
use crate::risk_form::RiskForm;
use crate::types::{Diagnosis, RiskAssessment, RiskRequest};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct DssClient {
    client: reqwest::Client,
    base_url: String,
}

impl DssClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a leaf image for diagnosis.
    ///
    /// # Errors
    /// Any transport failure or non-2xx response.
    #[instrument(skip(self, image), fields(bytes = image.len()), level = "info")]
    pub async fn analyze(&self, image: Vec<u8>, file_name: &str) -> Result<Diagnosis, ServiceError> {
        let url = format!("{}/analizar", self.base_url);
        let form = Form::new().part("file", Part::bytes(image).file_name(file_name.to_string()));

        let response = self.client.post(&url).multipart(form).send().await?;
        let diagnosis: Diagnosis = handle_response(response).await?;

        tracing::info!(
            "Diagnosis: {} (risk {}, {})",
            diagnosis.diagnosis,
            diagnosis.risk,
            diagnosis.confidence_percent()
        );
        Ok(diagnosis)
    }

    /// Ask the backend for the blight risk of validated readings.
    ///
    /// # Errors
    /// Any transport failure or non-2xx response.
    #[instrument(skip(self), level = "info")]
    pub async fn calculate_risk(&self, request: &RiskRequest) -> Result<RiskAssessment, ServiceError> {
        let url = format!("{}/calcular-riesgo", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        handle_response(response).await
    }

    /// Validate `form`, then call [`calculate_risk`](Self::calculate_risk).
    ///
    /// # Errors
    /// `ServiceError::Validation` without any request when a field does not
    /// parse; otherwise as `calculate_risk`.
    pub async fn calculate_risk_form(&self, form: &RiskForm) -> Result<RiskAssessment, ServiceError> {
        let request = form.validate()?;
        self.calculate_risk(&request).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            status.canonical_reason().unwrap_or("unknown").to_string()
        } else {
            body
        };
        tracing::debug!("Backend returned {}: {}", status, message);
        return Err(ServiceError::Server {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::InvalidResponse(e.to_string()))
}
