//! Vector tile addressing.
//!
//! Tiles follow the XYZ slippy-map scheme used by the boundary tile service:
//! `x` grows eastward, `y` grows southward, and zoom `z` has `2^z` tiles per axis.

use crate::error::TileError;
use crate::types::{LonLat, MAX_MERCATOR_LAT};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Highest zoom level the tile service is addressed with.
pub const MAX_TILE_ZOOM: u8 = 24;

/// Address of a single vector tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Creates a validated tile coordinate.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, TileError> {
        if z > MAX_TILE_ZOOM {
            return Err(TileError::ZoomOutOfRange {
                zoom: z,
                max: MAX_TILE_ZOOM,
            });
        }
        let n = 1u64 << z;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(TileError::OutOfBounds { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    /// Returns the tile containing a geographic coordinate at a zoom level.
    pub fn containing(position: LonLat, z: u8) -> Result<Self, TileError> {
        if z > MAX_TILE_ZOOM {
            return Err(TileError::ZoomOutOfRange {
                zoom: z,
                max: MAX_TILE_ZOOM,
            });
        }
        if !position.is_valid() {
            return Err(TileError::InvalidCoordinate {
                lon: position.lon,
                lat: position.lat,
            });
        }

        let n = 2.0_f64.powi(i32::from(z));
        let max_index = (n - 1.0).max(0.0);

        let x = ((position.lon + 180.0) / 360.0 * n).floor().min(max_index) as u32;

        let lat_rad = position.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
        let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n)
            .floor()
            .clamp(0.0, max_index) as u32;

        Ok(Self { z, x, y })
    }

    /// Geographic coordinate of the tile's northwest corner.
    pub fn northwest_corner(&self) -> LonLat {
        let n = 2.0_f64.powi(i32::from(self.z));
        let lon = f64::from(self.x) / n * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * f64::from(self.y) / n)).sinh().atan().to_degrees();
        LonLat::new(lon, lat)
    }

    /// Substitutes `{z}`, `{x}` and `{y}` in a tile URL template.
    pub fn fill_template(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
