//! Configuration management for `TravelCrew`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.
//!
//! Provider credentials can also come from the conventional variables
//! (`AMADEUS_CLIENT_ID`, `GOOGLE_API_KEY`, ...) when the config leaves them unset.

use crate::TravelCrewError;
use crate::tools::hotels::MAX_HOTELS_LIMIT;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Root configuration structure for `TravelCrew`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TravelCrewConfig {
    /// Flight and hotel provider configuration
    #[serde(default)]
    pub amadeus: AmadeusConfig,
    /// Place search provider configuration
    #[serde(default)]
    pub places: PlacesConfig,
    /// Currency conversion provider configuration
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Language model endpoint used by the pipeline
    #[serde(default)]
    pub llm: LlmConfig,
    /// City code table location
    #[serde(default)]
    pub locations: LocationsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Itinerary output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Flight and hotel provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmadeusConfig {
    /// OAuth client id
    pub client_id: Option<String>,
    /// OAuth client secret
    pub client_secret: Option<String>,
    /// Base URL for the provider API
    #[serde(default = "default_amadeus_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Currency requested for flight prices
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Maximum number of flight offers requested
    #[serde(default = "default_max_flight_offers")]
    pub max_flight_offers: u32,
    /// Default number of hotel candidates priced per search
    #[serde(default = "default_max_hotels")]
    pub max_hotels: u32,
}

/// Place search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// API key
    pub api_key: Option<String>,
    /// Base URL for the provider API
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Result language
    #[serde(default = "default_language")]
    pub language: String,
}

/// Currency provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// API key (part of the request path)
    pub api_key: Option<String>,
    /// Base URL for the provider API
    #[serde(default = "default_exchange_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Language model endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Bearer API key
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u32,
}

/// City code table settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationsConfig {
    /// JSON file replacing the embedded table
    pub table_path: Option<PathBuf>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Itinerary output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File the final itinerary is written to
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_amadeus_base_url() -> String {
    "https://test.api.amadeus.com".to_string()
}

fn default_places_base_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_exchange_base_url() -> String {
    "https://v6.exchangerate-api.com".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_llm_timeout() -> u32 {
    120
}

fn default_currency() -> String {
    "KRW".to_string()
}

fn default_max_flight_offers() -> u32 {
    10
}

fn default_max_hotels() -> u32 {
    10
}

fn default_language() -> String {
    "ko".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("itinerary.md")
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: default_amadeus_base_url(),
            timeout_seconds: default_timeout(),
            currency: default_currency(),
            max_flight_offers: default_max_flight_offers(),
            max_hotels: default_max_hotels(),
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_places_base_url(),
            timeout_seconds: default_timeout(),
            language: default_language(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_exchange_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

impl TravelCrewConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRAVELCREW_AMADEUS__BASE_URL -> amadeus.base_url
        builder = builder.add_source(
            Environment::with_prefix("TRAVELCREW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TravelCrewConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_env_credentials(|name| env::var(name).ok());
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("travelcrew").join("config.toml"))
    }

    /// Fill credentials still unset from the provider's conventional variables
    pub fn apply_env_credentials<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, name: &str| {
            if slot.as_deref().is_none_or(str::is_empty) {
                if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                    *slot = Some(value);
                }
            }
        };

        fill(&mut self.amadeus.client_id, "AMADEUS_CLIENT_ID");
        fill(&mut self.amadeus.client_secret, "AMADEUS_CLIENT_SECRET");
        fill(&mut self.places.api_key, "GOOGLE_API_KEY");
        fill(&mut self.exchange.api_key, "EXCHANGE_RATE_API_KEY");
        fill(&mut self.llm.api_key, "OPENAI_API_KEY");
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.amadeus.base_url.is_empty() {
            self.amadeus.base_url = default_amadeus_base_url();
        }
        if self.amadeus.timeout_seconds == 0 {
            self.amadeus.timeout_seconds = default_timeout();
        }
        if self.amadeus.currency.is_empty() {
            self.amadeus.currency = default_currency();
        }
        if self.amadeus.max_flight_offers == 0 {
            self.amadeus.max_flight_offers = default_max_flight_offers();
        }
        if self.amadeus.max_hotels == 0 {
            self.amadeus.max_hotels = default_max_hotels();
        }
        if self.places.base_url.is_empty() {
            self.places.base_url = default_places_base_url();
        }
        if self.places.timeout_seconds == 0 {
            self.places.timeout_seconds = default_timeout();
        }
        if self.places.language.is_empty() {
            self.places.language = default_language();
        }
        if self.exchange.base_url.is_empty() {
            self.exchange.base_url = default_exchange_base_url();
        }
        if self.exchange.timeout_seconds == 0 {
            self.exchange.timeout_seconds = default_timeout();
        }
        if self.llm.base_url.is_empty() {
            self.llm.base_url = default_llm_base_url();
        }
        if self.llm.model.is_empty() {
            self.llm.model = default_llm_model();
        }
        if self.llm.timeout_seconds == 0 {
            self.llm.timeout_seconds = default_llm_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.output.path.as_os_str().is_empty() {
            self.output.path = default_output_path();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        let timeouts = [
            ("Amadeus", self.amadeus.timeout_seconds),
            ("Places", self.places.timeout_seconds),
            ("Exchange", self.exchange.timeout_seconds),
            ("LLM", self.llm.timeout_seconds),
        ];
        for (name, timeout) in timeouts {
            if timeout > 600 {
                return Err(TravelCrewError::config(format!(
                    "{name} API timeout cannot exceed 600 seconds"
                ))
                .into());
            }
        }

        if self.amadeus.max_flight_offers > 250 {
            return Err(
                TravelCrewError::config("Maximum flight offers cannot exceed 250").into(),
            );
        }

        if self.amadeus.max_hotels > MAX_HOTELS_LIMIT {
            return Err(TravelCrewError::config(format!(
                "Maximum hotels cannot exceed {MAX_HOTELS_LIMIT}"
            ))
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelCrewError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelCrewError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Amadeus", &self.amadeus.base_url),
            ("Places", &self.places.base_url),
            ("Exchange", &self.exchange.base_url),
            ("LLM", &self.llm.base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TravelCrewError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        let currency = &self.amadeus.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(TravelCrewError::config(format!(
                "Invalid currency '{currency}'. Expected a three-letter ISO code such as KRW"
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TravelCrewConfig::default();
        assert_eq!(config.amadeus.base_url, "https://test.api.amadeus.com");
        assert_eq!(config.amadeus.timeout_seconds, 30);
        assert_eq!(config.amadeus.currency, "KRW");
        assert_eq!(config.amadeus.max_hotels, 10);
        assert_eq!(config.places.language, "ko");
        assert_eq!(config.logging.level, "info");
        assert!(config.amadeus.client_id.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = TravelCrewConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = TravelCrewConfig::default();
        config.places.timeout_seconds = 900;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_rejects_bad_url_and_currency() {
        let mut config = TravelCrewConfig::default();
        config.exchange.base_url = "ftp://rates".to_string();
        assert!(config.validate().is_err());

        let mut config = TravelCrewConfig::default();
        config.amadeus.currency = "won".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Invalid currency"));
    }

    #[test]
    fn test_env_credentials_fill_only_unset_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("AMADEUS_CLIENT_ID", "env-client"),
            ("AMADEUS_CLIENT_SECRET", "env-secret"),
            ("GOOGLE_API_KEY", "env-google"),
            ("EXCHANGE_RATE_API_KEY", ""),
        ]);

        let mut config = TravelCrewConfig::default();
        config.amadeus.client_id = Some("file-client".to_string());
        config.apply_env_credentials(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.amadeus.client_id.as_deref(), Some("file-client"));
        assert_eq!(config.amadeus.client_secret.as_deref(), Some("env-secret"));
        assert_eq!(config.places.api_key.as_deref(), Some("env-google"));
        assert!(config.exchange.api_key.is_none());
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_apply_defaults_restores_empty_values() {
        let mut config = TravelCrewConfig::default();
        config.amadeus.max_hotels = 0;
        config.places.language = String::new();
        config.apply_defaults();
        assert_eq!(config.amadeus.max_hotels, 10);
        assert_eq!(config.places.language, "ko");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[amadeus]
client_id = "file-client"
max_hotels = 3

[places]
language = "en"

[output]
path = "plans/osaka.md"
"#
        )
        .unwrap();

        let config = TravelCrewConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.amadeus.client_id.as_deref(), Some("file-client"));
        assert_eq!(config.amadeus.max_hotels, 3);
        assert_eq!(config.amadeus.currency, "KRW");
        assert_eq!(config.places.language, "en");
        assert_eq!(config.output.path, PathBuf::from("plans/osaka.md"));
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = TravelCrewConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("travelcrew"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
