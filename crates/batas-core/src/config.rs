//! Configuration management for the batas-desa explorer.
//!
//! Every setting has a default equal to the constant the explorer ships with,
//! so an empty configuration is a working one. Values can be overridden by a
//! YAML file and by `BATAS__*` environment variables
//! (for example `BATAS__API__BASE_URL=https://desa.example.org`).

use crate::error::{ConfigError, Result};
use crate::tile::MAX_TILE_ZOOM;
use crate::types::LonLat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Main application configuration.
///
/// # Examples
///
/// ```
/// use batas_core::config::AppConfig;
///
/// let config = AppConfig::from_yaml("api:\n  base_url: http://desa.local\n").unwrap();
/// assert_eq!(config.api.base_url, "http://desa.local");
/// assert_eq!(config.map.fly_to_zoom, 14.0);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Map view settings
    #[serde(default)]
    pub map: MapConfig,

    /// Search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path.display().to_string()).into());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration in layers: built-in defaults, then the optional
    /// file, then `BATAS__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the merged result does
    /// not deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let location = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string());

        let defaults = config::Config::try_from(&AppConfig::default()).map_err(|e| {
            ConfigError::LoadFailed {
                path: location.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::file_not_found(location).into());
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("BATAS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: location,
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.map.validate()?;
        self.search.validate()?;
        self.logging.parse_level()?;
        Ok(())
    }
}

/// Backend API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the `/api/v1/...` paths are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the API configuration.
    pub fn validate(&self) -> Result<()> {
        let rest = self
            .base_url
            .strip_prefix("http://")
            .or_else(|| self.base_url.strip_prefix("https://"))
            .ok_or_else(|| {
                ConfigError::invalid_value("api.base_url", "must start with http:// or https://")
            })?;

        if rest.is_empty() || rest.starts_with('/') || rest.contains(char::is_whitespace) {
            return Err(ConfigError::invalid_value(
                "api.base_url",
                format!("'{}' has no usable host", self.base_url),
            )
            .into());
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid_value("api.timeout_secs", "must be positive").into());
        }

        Ok(())
    }
}

/// Map view settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// View center when the map is created
    #[serde(default = "default_initial_center")]
    pub initial_center: LonLat,

    /// Zoom level when the map is created
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: f64,

    /// Target zoom of a fly-to animation
    #[serde(default = "default_fly_to_zoom")]
    pub fly_to_zoom: f64,

    /// Duration of a fly-to animation in milliseconds
    #[serde(default = "default_fly_to_duration_ms")]
    pub fly_to_duration_ms: u64,

    /// Hit tolerance for feature picking, in pixels
    #[serde(default = "default_hit_tolerance_px")]
    pub hit_tolerance_px: f64,

    /// Opacity of the boundary overlay layer
    #[serde(default = "default_overlay_opacity")]
    pub overlay_opacity: f64,
}

fn default_initial_center() -> LonLat {
    LonLat::new(110.3695, -7.7956)
}

fn default_initial_zoom() -> f64 {
    5.0
}

fn default_fly_to_zoom() -> f64 {
    14.0
}

fn default_fly_to_duration_ms() -> u64 {
    1000
}

fn default_hit_tolerance_px() -> f64 {
    5.0
}

fn default_overlay_opacity() -> f64 {
    0.5
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_center: default_initial_center(),
            initial_zoom: default_initial_zoom(),
            fly_to_zoom: default_fly_to_zoom(),
            fly_to_duration_ms: default_fly_to_duration_ms(),
            hit_tolerance_px: default_hit_tolerance_px(),
            overlay_opacity: default_overlay_opacity(),
        }
    }
}

impl MapConfig {
    pub fn fly_to_duration(&self) -> Duration {
        Duration::from_millis(self.fly_to_duration_ms)
    }

    /// Validates the map configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.initial_center.is_valid() {
            return Err(ConfigError::invalid_value(
                "map.initial_center",
                format!("({}) is outside the projectable range", self.initial_center),
            )
            .into());
        }

        let zoom_range = 0.0..=f64::from(MAX_TILE_ZOOM);
        for (field, zoom) in [
            ("map.initial_zoom", self.initial_zoom),
            ("map.fly_to_zoom", self.fly_to_zoom),
        ] {
            if !zoom_range.contains(&zoom) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("{} is outside 0..={}", zoom, MAX_TILE_ZOOM),
                )
                .into());
            }
        }

        if !(self.hit_tolerance_px >= 0.0 && self.hit_tolerance_px.is_finite()) {
            return Err(
                ConfigError::invalid_value("map.hit_tolerance_px", "must be non-negative").into(),
            );
        }

        if !(0.0..=1.0).contains(&self.overlay_opacity) {
            return Err(
                ConfigError::invalid_value("map.overlay_opacity", "must be within 0..=1").into(),
            );
        }

        Ok(())
    }
}

/// Search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Queries shorter than this many characters are not sent
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

fn default_min_query_chars() -> usize {
    2
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_chars: default_min_query_chars(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_query_chars == 0 {
            return Err(
                ConfigError::invalid_value("search.min_query_chars", "must be at least 1").into(),
            );
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Invalid log level: {}", self.level),
            }
            .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatasError;

    #[test]
    fn test_defaults_match_shipped_constants() {
        let config = AppConfig::default();
        assert_eq!(config.api.base_url, "http://localhost");
        assert_eq!(config.map.initial_center, LonLat::new(110.3695, -7.7956));
        assert_eq!(config.map.initial_zoom, 5.0);
        assert_eq!(config.map.fly_to_zoom, 14.0);
        assert_eq!(config.map.fly_to_duration(), Duration::from_secs(1));
        assert_eq!(config.map.hit_tolerance_px, 5.0);
        assert_eq!(config.map.overlay_opacity, 0.5);
        assert_eq!(config.search.min_query_chars, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
api:
  base_url: "https://desa.example.org"
map:
  fly_to_zoom: 12
logging:
  format: json
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://desa.example.org");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.map.fly_to_zoom, 12.0);
        assert_eq!(config.map.hit_tolerance_px, 5.0);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = AppConfig::from_yaml("api: [unclosed").unwrap_err();
        assert!(matches!(
            err,
            BatasError::Config(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.api.base_url = "localhost:8080".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.api.base_url = "http://".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.map.overlay_opacity = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.map.fly_to_zoom = 40.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.map.hit_tolerance_px = -1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "chatty".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/batas.yaml"))).unwrap_err();
        assert!(matches!(
            err,
            BatasError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_layers_file_over_defaults() {
        let path = std::env::temp_dir().join("batas-core-config-test.yaml");
        std::fs::write(&path, "search:\n  min_query_chars: 3\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.search.min_query_chars, 3);
        assert_eq!(config.map.initial_zoom, 5.0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_log_level_parsing() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Text,
        };
        assert_eq!(logging.parse_level().unwrap(), Level::DEBUG);
    }
}
