//! # batas-core
//!
//! Core types, error handling, and configuration for the batas-desa village
//! boundary explorer.
//!
//! - **Types**: village records ([`Entity`]), identifiers, geographic and map
//!   coordinates, and vector tile addressing.
//! - **Features**: the typed adapter that turns the attribute bag of a rendered
//!   map feature into application values ([`FlyTarget`], [`VillageCaption`]).
//! - **Errors**: `thiserror` based error types for configuration, feature and
//!   tile failures.
//! - **Configuration**: YAML configuration with environment overrides and
//!   validation. Defaults match the constants the explorer ships with.
//!
//! ## Example
//!
//! ```
//! use batas_core::types::{EntityId, LonLat};
//! use batas_core::feature::FlyTarget;
//!
//! let target = FlyTarget::new(LonLat::new(110.1, -7.5), EntityId::new(42), "330101");
//! assert_eq!(target.id, EntityId::new(42));
//! ```

pub mod config;
pub mod error;
pub mod feature;
pub mod tile;
pub mod types;

pub use config::AppConfig;
pub use error::{BatasError, Result};
pub use feature::{FeatureProperties, FlyTarget, VillageCaption};
pub use tile::TileCoord;
pub use types::{Entity, EntityId, LonLat, MapCoordinate, Pixel, ViewState};
