//! Configuration management for `PalatePilot`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::PalatePilotError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for `PalatePilot`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PalatePilotConfig {
    /// Open-Meteo geocoding and forecast settings
    pub weather: WeatherConfig,
    /// Search provider and page scraping settings
    pub search: SearchConfig,
    /// Agent-execution service settings
    pub agent: AgentConfig,
    /// Coordinate cache settings
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Batch output settings
    pub output: OutputConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Geocoding endpoint
    pub geocoding_url: String,
    /// Forecast endpoint
    pub forecast_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
}

/// Search provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// SerpAPI base URL
    pub base_url: String,
    /// SerpAPI key; falls back to `SERPAPI_API_KEY`
    pub api_key: Option<String>,
    /// Number of result URLs scraped per query
    pub results_per_query: u32,
    /// Per-page fetch timeout in seconds
    pub fetch_timeout_seconds: u32,
}

/// Agent-execution service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// REST base URL of the execution service
    pub base_url: String,
    /// Bearer token; falls back to `JULEP_API_KEY`
    pub api_key: Option<String>,
    /// Reuse an existing agent instead of creating one per run
    pub agent_id: Option<String>,
    pub name: String,
    pub about: String,
    pub model: String,
    /// Interval between execution status polls
    pub poll_interval_ms: u64,
    pub tour_timeout_seconds: u32,
    pub dish_timeout_seconds: u32,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Persist resolved coordinates between runs
    pub enabled: bool,
    /// Cache directory location
    pub location: String,
    /// Cache TTL in hours
    pub ttl_hours: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
    /// OTLP/HTTP collector endpoint for span export
    pub otlp_endpoint: Option<String>,
}

/// Batch output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix of the top-level `<label>_tours` key
    pub label: String,
    /// Output file; defaults to `<label>_tours.json`
    pub path: Option<String>,
}

// Default value functions
fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_weather_timeout() -> u32 {
    10
}

fn default_weather_max_retries() -> u32 {
    2
}

fn default_search_base_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_results_per_query() -> u32 {
    3
}

fn default_fetch_timeout() -> u32 {
    10
}

fn default_agent_base_url() -> String {
    "https://api.julep.ai/api".to_string()
}

fn default_agent_name() -> String {
    "PalatePilot".to_string()
}

fn default_agent_about() -> String {
    "A weather-aware foodie tour generator".to_string()
}

fn default_agent_model() -> String {
    "gpt-4o".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_tour_timeout() -> u32 {
    60
}

fn default_dish_timeout() -> u32 {
    30
}

fn default_cache_location() -> String {
    "~/.cache/palatepilot".to_string()
}

fn default_cache_ttl() -> u32 {
    24 * 30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_output_label() -> String {
    "foodie".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            timeout_seconds: default_weather_timeout(),
            max_retries: default_weather_max_retries(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key: None,
            results_per_query: default_results_per_query(),
            fetch_timeout_seconds: default_fetch_timeout(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_agent_base_url(),
            api_key: None,
            agent_id: None,
            name: default_agent_name(),
            about: default_agent_about(),
            model: default_agent_model(),
            poll_interval_ms: default_poll_interval_ms(),
            tour_timeout_seconds: default_tour_timeout(),
            dish_timeout_seconds: default_dish_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            location: default_cache_location(),
            ttl_hours: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            label: default_output_label(),
            path: None,
        }
    }
}

impl AgentConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn tour_timeout(&self) -> Duration {
        Duration::from_secs(self.tour_timeout_seconds.into())
    }

    #[must_use]
    pub fn dish_timeout(&self) -> Duration {
        Duration::from_secs(self.dish_timeout_seconds.into())
    }
}

impl CacheConfig {
    /// Cache directory with a leading `~` expanded to the home directory
    #[must_use]
    pub fn resolved_location(&self) -> PathBuf {
        match self.location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.location)),
            None => PathBuf::from(&self.location),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_hours) * 60 * 60)
    }
}

impl OutputConfig {
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}_tours.json", self.label)))
    }
}

impl PalatePilotConfig {
    /// Load configuration from the given file, or the default location when
    /// `None`, then apply environment overrides
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

        // PALATEPILOT_AGENT__API_KEY -> agent.api_key
        builder = builder.add_source(
            Environment::with_prefix("PALATEPILOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PalatePilotConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.apply_key_fallbacks();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("palatepilot").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.geocoding_url.is_empty() {
            self.weather.geocoding_url = default_geocoding_url();
        }
        if self.weather.forecast_url.is_empty() {
            self.weather.forecast_url = default_forecast_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.search.base_url.is_empty() {
            self.search.base_url = default_search_base_url();
        }
        if self.search.results_per_query == 0 {
            self.search.results_per_query = default_results_per_query();
        }
        if self.search.fetch_timeout_seconds == 0 {
            self.search.fetch_timeout_seconds = default_fetch_timeout();
        }
        if self.agent.base_url.is_empty() {
            self.agent.base_url = default_agent_base_url();
        }
        if self.agent.name.is_empty() {
            self.agent.name = default_agent_name();
        }
        if self.agent.model.is_empty() {
            self.agent.model = default_agent_model();
        }
        if self.agent.poll_interval_ms == 0 {
            self.agent.poll_interval_ms = default_poll_interval_ms();
        }
        if self.agent.tour_timeout_seconds == 0 {
            self.agent.tour_timeout_seconds = default_tour_timeout();
        }
        if self.agent.dish_timeout_seconds == 0 {
            self.agent.dish_timeout_seconds = default_dish_timeout();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.cache.ttl_hours == 0 {
            self.cache.ttl_hours = default_cache_ttl();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.output.label.is_empty() {
            self.output.label = default_output_label();
        }
    }

    /// Pick up the provider keys from their conventional variables
    fn apply_key_fallbacks(&mut self) {
        if self.search.api_key.is_none() {
            self.search.api_key = std::env::var("SERPAPI_API_KEY").ok();
        }
        if self.agent.api_key.is_none() {
            self.agent.api_key = std::env::var("JULEP_API_KEY").ok();
        }
    }

    /// Replace the output label after loading, checked like a configured one
    pub fn set_output_label(&mut self, label: impl Into<String>) -> Result<()> {
        self.output.label = label.into();
        self.validate_string_values()
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        for (name, key) in [
            ("Search", &self.search.api_key),
            ("Agent service", &self.agent.api_key),
        ] {
            if let Some(key) = key {
                if key.trim().is_empty() {
                    return Err(PalatePilotError::config(format!(
                        "{name} API key cannot be empty if provided. Either remove it or provide a valid key."
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(PalatePilotError::config("Weather API timeout cannot exceed 300 seconds").into());
        }

        if self.weather.max_retries > 10 {
            return Err(PalatePilotError::config("Weather API max retries cannot exceed 10").into());
        }

        if self.search.results_per_query > 10 {
            return Err(PalatePilotError::config("Search results per query cannot exceed 10").into());
        }

        if self.search.fetch_timeout_seconds > 300 {
            return Err(PalatePilotError::config("Page fetch timeout cannot exceed 300 seconds").into());
        }

        if !(100..=60_000).contains(&self.agent.poll_interval_ms) {
            return Err(PalatePilotError::config(
                "Agent poll interval must be between 100 and 60000 milliseconds",
            )
            .into());
        }

        if self.agent.tour_timeout_seconds > 300 || self.agent.dish_timeout_seconds > 300 {
            return Err(PalatePilotError::config("Agent execution timeout cannot exceed 300 seconds").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PalatePilotError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PalatePilotError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Geocoding", &self.weather.geocoding_url),
            ("Forecast", &self.weather.forecast_url),
            ("Search", &self.search.base_url),
            ("Agent service", &self.agent.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PalatePilotError::config(format!(
                    "{name} URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if self.output.label.is_empty() {
            return Err(PalatePilotError::config("Output label cannot be empty").into());
        }

        if self.output.label.contains(char::is_whitespace) {
            return Err(PalatePilotError::config("Output label cannot contain whitespace").into());
        }

        Ok(())
    }
}
