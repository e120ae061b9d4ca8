//! Error types for the batas-desa explorer.
//!
//! Coordinators never surface these to the user; they are logged and the
//! affected state degrades to empty. Configuration and tile errors do reach
//! callers of the library and the command-line probe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using BatasError as the error type.
pub type Result<T> = std::result::Result<T, BatasError>;

/// Top-level error type for all batas-desa operations.
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum BatasError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A rendered feature did not carry the attributes the explorer needs
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// Tile addressing errors
    #[error("Tile error: {0}")]
    Tile(#[from] TileError),

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors related to configuration.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised when adapting map feature properties.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FeatureError {
    /// Missing required property
    #[error("Missing required property: {field}")]
    MissingField { field: String },

    /// Property present but unusable
    #[error("Invalid value for property '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl FeatureError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors related to vector tile addressing.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum TileError {
    /// Zoom level above the supported maximum
    #[error("Zoom level {zoom} exceeds maximum {max}")]
    ZoomOutOfRange { zoom: u8, max: u8 },

    /// Column or row outside the tile grid for the zoom level
    #[error("Tile {z}/{x}/{y} is outside the tile grid")]
    OutOfBounds { z: u8, x: u32, y: u32 },

    /// Coordinate outside the Web Mercator domain
    #[error("Coordinate ({lon}, {lat}) is outside the Web Mercator domain")]
    InvalidCoordinate { lon: f64, lat: f64 },
}

/// Extension trait for converting Results to BatasError.
pub trait ResultExt<T> {
    /// Converts the error to an internal error with context.
    fn internal_context(self, context: &str) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn internal_context(self, context: &str) -> Result<T> {
        self.map_err(|e| BatasError::Internal(format!("{}: {}", context, e)))
    }
}
