//! Typed failures surfaced by the aggregator and the CWA client.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{endpoint} request failed with status {status}: {body}")]
    Http {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse {endpoint} JSON: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("No sunrise/sunset data for {location} on {date}")]
    DataUnavailable { location: String, date: String },

    #[error("Response is missing field `{0}`")]
    MissingField(String),

    #[error("Field `{field}` has unusable value {value:?}")]
    InvalidField { field: String, value: String },
}

impl WeatherError {
    pub(crate) fn missing(path: &str) -> Self {
        Self::MissingField(path.to_string())
    }

    pub(crate) fn invalid(field: &str, value: impl ToString) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Short message suitable for the card's error line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Http { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                "The weather service rejected the API key.".to_string()
            }
            Self::Http { status, .. } => format!("Weather service error ({status})."),
            Self::Decode { .. } | Self::MissingField(_) | Self::InvalidField { .. } => {
                "The weather service returned unexpected data.".to_string()
            }
            Self::DataUnavailable { location, date } => {
                format!("No sunrise/sunset data for {location} on {date}.")
            }
        }
    }

    /// Whether the failure came from the transport or the remote service
    /// rather than from the shape of the data.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http { .. })
    }
}
