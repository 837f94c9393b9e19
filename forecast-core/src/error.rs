use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the provider, locator and storage collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Geolocation unavailable: {0}")]
    GeolocationUnavailable(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error(
        "No OpenWeather API key configured.\n\
         Hint: set OPENWEATHER_API_KEY or run `forecast configure`."
    )]
    MissingApiKey,
}

impl WeatherError {
    /// Tag recorded by the state machine when a primary fetch fails.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            WeatherError::LocationNotFound(_) => FailureReason::NotFound,
            _ => FailureReason::Network,
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(e: serde_json::Error) -> Self {
        WeatherError::Network(format!("malformed provider response: {e}"))
    }
}

/// Why the last primary fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    NotFound,
    Network,
}

impl FailureReason {
    /// User-facing banner text.
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::NotFound => "City not found. Please try another city.",
            FailureReason::Network => "Failed to fetch weather data. Please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, WeatherError>;
