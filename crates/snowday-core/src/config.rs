use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Names accepted in the `[weights]` override table.
pub const KNOWN_WEIGHT_NAMES: [&str; 13] = [
    "snowfall_multiplier",
    "snowfall_max",
    "temp_below_zero",
    "temp_below_two",
    "temp_below_five",
    "temp_above_five_penalty",
    "precip_multiplier",
    "wind_above_25",
    "wind_above_40",
    "public_school_bonus",
    "university_penalty",
    "district_cautious_bonus",
    "district_resistant_penalty",
];

const KNOWN_SCHOOL_TYPES: [&str; 3] = ["public", "private", "university"];
const KNOWN_CAUTION_LEVELS: [&str; 3] = ["standard", "cautious", "resistant"];

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Geocoding and forecast endpoints
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Where the forecast cache and vote tally live
    #[serde(default)]
    pub storage: StorageConfig,

    /// School type and caution level used when none is given
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Algorithm weight overrides, by weight name
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Base URL of the postal-code geocoding service
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,

    /// Base URL of the hourly forecast service
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Country segment used for postal-code lookups
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Deadline for the whole lookup (geocode + forecast), in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Forecast cache lifetime in minutes
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u32,

    /// Retries for transient HTTP failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff in milliseconds (doubles each attempt)
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
}

fn default_geocode_url() -> String {
    "https://api.zippopotam.us".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_country_code() -> String {
    "us".to_string()
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_cache_ttl_minutes() -> u32 {
    60
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_initial_delay_ms() -> u64 {
    200
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            geocode_url: default_geocode_url(),
            forecast_url: default_forecast_url(),
            country_code: default_country_code(),
            timeout_ms: default_timeout_ms(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            max_retries: default_max_retries(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file name inside `data_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snowday")
}

fn default_database_file() -> String {
    "snowday.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_file: default_database_file(),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_school_type")]
    pub school_type: String,

    #[serde(default = "default_caution_level")]
    pub caution_level: String,
}

fn default_school_type() -> String {
    "public".to_string()
}

fn default_caution_level() -> String {
    "standard".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            school_type: default_school_type(),
            caution_level: default_caution_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("snowday");

        Self {
            config_dir,
            forecast: ForecastConfig::default(),
            storage: StorageConfig::default(),
            defaults: DefaultsConfig::default(),
            weights: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.forecast.geocode_url, "forecast.geocode_url", &mut result);
        self.validate_url(&self.forecast.forecast_url, "forecast.forecast_url", &mut result);

        if self.forecast.country_code.trim().is_empty() {
            result.add_error("forecast.country_code", "Country code must not be empty");
        }

        if self.forecast.timeout_ms == 0 {
            result.add_error("forecast.timeout_ms", "Timeout must be greater than 0");
        } else if self.forecast.timeout_ms > 60_000 {
            result.add_warning(
                "forecast.timeout_ms",
                "Timeout is longer than a minute; calculations may appear stuck",
            );
        }

        if self.forecast.cache_ttl_minutes == 0 {
            result.add_warning(
                "forecast.cache_ttl_minutes",
                "Forecast cache disabled (0 minutes)",
            );
        } else if self.forecast.cache_ttl_minutes > 1440 {
            result.add_warning(
                "forecast.cache_ttl_minutes",
                "Forecast cache lifetime is more than 24 hours",
            );
        }

        if self.forecast.max_retries > 5 {
            result.add_warning(
                "forecast.max_retries",
                "More than 5 retries rarely fit inside the request deadline",
            );
        }

        if self.storage.database_file.trim().is_empty() {
            result.add_error("storage.database_file", "Database file name must not be empty");
        }

        if !KNOWN_SCHOOL_TYPES.contains(&self.defaults.school_type.as_str()) {
            result.add_error(
                "defaults.school_type",
                format!(
                    "Unknown school type '{}' (expected one of: {})",
                    self.defaults.school_type,
                    KNOWN_SCHOOL_TYPES.join(", ")
                ),
            );
        }

        if !KNOWN_CAUTION_LEVELS.contains(&self.defaults.caution_level.as_str()) {
            result.add_error(
                "defaults.caution_level",
                format!(
                    "Unknown caution level '{}' (expected one of: {})",
                    self.defaults.caution_level,
                    KNOWN_CAUTION_LEVELS.join(", ")
                ),
            );
        }

        for (name, value) in &self.weights {
            let field = format!("weights.{}", name);
            if !KNOWN_WEIGHT_NAMES.contains(&name.as_str()) {
                result.add_error(field, "Unknown weight name");
            } else if !value.is_finite() {
                result.add_error(field, "Weight must be a finite number");
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("snowday");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(
            result.is_valid(),
            "Default config should be valid: {:?}",
            result.errors
        );
        assert_eq!(config.forecast.timeout_ms, 8000);
        assert_eq!(config.forecast.cache_ttl_minutes, 60);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.forecast.forecast_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "forecast.forecast_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.forecast.geocode_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let mut config = Config::default();
        config.forecast.timeout_ms = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "forecast.timeout_ms"));
    }

    #[test]
    fn test_disabled_cache_is_warning() {
        let mut config = Config::default();
        config.forecast.cache_ttl_minutes = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "forecast.cache_ttl_minutes"));
    }

    #[test]
    fn test_unknown_weight_is_error() {
        let mut config = Config::default();
        config.weights.insert("snow_power".to_string(), 3.0);
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weights.snow_power"));
    }

    #[test]
    fn test_non_finite_weight_is_error() {
        let mut config = Config::default();
        config.weights.insert("snowfall_max".to_string(), f64::INFINITY);
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_unknown_default_school_type() {
        let mut config = Config::default();
        config.defaults.school_type = "academy".to_string();
        let result = config.validate();
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "defaults.school_type"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_load_creates_default_then_round_trips_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(created.weights.is_empty());

        let mut edited = created;
        edited.weights.insert("snowfall_max".to_string(), 60.0);
        edited.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.weights.get("snowfall_max"), Some(&60.0));
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/snowday\"\n\n[forecast]\ntimeout_ms = 5000\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.forecast.timeout_ms, 5000);
        assert_eq!(config.forecast.cache_ttl_minutes, 60);
        assert_eq!(config.defaults.school_type, "public");
    }
}
