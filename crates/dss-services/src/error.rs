//! Errors from the diagnosis and risk endpoints.

use thiserror::Error;

/// A required risk input that is missing or not a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be a number")]
    NotANumber(&'static str),
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        "Please fill in all fields."
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ServiceError {
    /// User-friendly message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::Server { .. } | Self::InvalidResponse(_) => {
                "Could not connect to the server."
            }
            Self::Validation(e) => e.user_message(),
            Self::InvalidUrl(_) => "The server address is invalid. Check your settings.",
        }
    }
}
