//! Error types and handling for `TravelCrew`

use thiserror::Error;

/// Main error type for the `TravelCrew` library
#[derive(Error, Debug)]
pub enum TravelCrewError {
    /// Credential exchange with a provider was rejected
    #[error("Authentication failed: {body}")]
    AuthFailure { body: String },

    /// City name missing from the city code table
    #[error("Unknown location: '{name}'")]
    UnknownLocation { name: String },

    /// Non-success response from a data provider
    #[error("{provider} request failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Currency provider answered but reported a logical failure
    #[error("Currency conversion failed: {reason}")]
    ConversionFailure { reason: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Transport-level HTTP errors
    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// JSON (de)serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TravelCrewError {
    /// Create a new authentication error
    pub fn auth<S: Into<String>>(body: S) -> Self {
        Self::AuthFailure { body: body.into() }
    }

    /// Create a new unknown location error
    pub fn unknown_location<S: Into<String>>(name: S) -> Self {
        Self::UnknownLocation { name: name.into() }
    }

    /// Create a new provider error
    pub fn provider<P: Into<String>, S: Into<String>>(
        provider: P,
        status: Option<u16>,
        message: S,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a new conversion error
    pub fn conversion<S: Into<String>>(reason: S) -> Self {
        Self::ConversionFailure {
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelCrewError::AuthFailure { .. } => {
                "Provider authentication failed. Please check your client id and secret.".to_string()
            }
            TravelCrewError::UnknownLocation { name } => {
                format!("Unknown location '{name}'. Use a city from `travelcrew tools`.")
            }
            TravelCrewError::Provider { provider, .. } => {
                format!("The {provider} service returned an error. Please try again later.")
            }
            TravelCrewError::ConversionFailure { reason } => {
                format!("Currency conversion failed: {reason}")
            }
            TravelCrewError::Config { message } => format!("Configuration error: {message}"),
            TravelCrewError::Validation { message } => format!("Invalid input: {message}"),
            TravelCrewError::Http { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            TravelCrewError::Json { .. } => "Received malformed data.".to_string(),
            TravelCrewError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
