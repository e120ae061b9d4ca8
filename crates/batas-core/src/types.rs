//! Core types for the batas-desa explorer.
//!
//! Village records arrive from a backend whose schema is not validated, so
//! attribute deserialization is lenient: codes may be numbers or strings,
//! measures may be numbers or numeric strings, and a geometry of an
//! unexpected shape is dropped instead of failing the whole record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::f64::consts::PI;
use std::fmt;

/// Equatorial radius used by EPSG:3857, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Identifier of a village record.
///
/// The value `0` is reserved for "no entity" and is never a valid selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    /// The "no entity" identifier.
    pub const NONE: EntityId = EntityId(0);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// Returns true for the reserved "no entity" value.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Reads an identifier from a loosely typed JSON value.
    ///
    /// Accepts integers, integral floats and numeric strings.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(EntityId)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(EntityId::NONE);
        }
        EntityId::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid entity id: {}", value)))
    }
}

/// Geographic coordinate in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns true if the coordinate is finite and within the projectable range.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-MAX_MERCATOR_LAT..=MAX_MERCATOR_LAT).contains(&self.lat)
    }

    /// Forward EPSG:3857 transform, the coordinate space the map view uses.
    ///
    /// Latitudes beyond the Mercator limit are clamped.
    pub fn to_map_coordinate(&self) -> MapCoordinate {
        let lat = self.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let x = EARTH_RADIUS_M * self.lon.to_radians();
        let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        MapCoordinate { x, y }
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lon, self.lat)
    }
}

/// Projected map coordinate in EPSG:3857 meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCoordinate {
    pub x: f64,
    pub y: f64,
}

impl MapCoordinate {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Inverse EPSG:3857 transform.
    pub fn to_lon_lat(&self) -> LonLat {
        let lon = (self.x / EARTH_RADIUS_M).to_degrees();
        let lat = (2.0 * (self.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
        LonLat { lon, lat }
    }
}

/// Screen position in CSS pixels relative to the map container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Center and zoom of the map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: MapCoordinate,
    pub zoom: f64,
}

impl ViewState {
    pub fn new(center: LonLat, zoom: f64) -> Self {
        Self {
            center: center.to_map_coordinate(),
            zoom,
        }
    }
}

/// Boundary geometry of a village.
///
/// Carried for completeness; the map renders boundaries from vector tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<Vec<Vec<f64>>>>,
}

impl Geometry {
    pub fn polygon_count(&self) -> usize {
        self.coordinates.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.coordinates
            .iter()
            .flat_map(|polygon| polygon.iter())
            .map(|ring| ring.len())
            .sum()
    }
}

/// A village record.
///
/// Search results carry a subset of these attributes; detail responses carry
/// all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub kode_desa: Option<String>,
    /// Village name
    #[serde(default, deserialize_with = "lenient::string")]
    pub namobj: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub fcode: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub remark: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub metadata: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub srs_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub kdbbps: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub kdcbps: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub kdcpum: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub kdebps: Option<String>,
    /// Lookup key for detail fetches
    #[serde(default, deserialize_with = "lenient::string")]
    pub kdepum: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub kdpbps: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub kdpkab: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub kdppum: Option<String>,
    /// Area in hectares
    #[serde(default, deserialize_with = "lenient::number")]
    pub luaswh: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub tipadm: Option<f64>,
    /// Sub-district name
    #[serde(default, deserialize_with = "lenient::string")]
    pub wadmkc: Option<String>,
    /// Village name as registered administratively
    #[serde(default, deserialize_with = "lenient::string")]
    pub wadmkd: Option<String>,
    /// Regency or city name
    #[serde(default, deserialize_with = "lenient::string")]
    pub wadmkk: Option<String>,
    /// Province name
    #[serde(default, deserialize_with = "lenient::string")]
    pub wadmpr: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub wiadkc: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub wiadkd: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub wiadkk: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub wiadpr: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub uupp: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub shape_leng: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub shape_area: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::geometry")]
    pub geom: Option<Geometry>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub area_km2: Option<f64>,
}

impl Entity {
    /// Anchor position of the village, when both coordinates are known.
    pub fn position(&self) -> Option<LonLat> {
        Some(LonLat::new(self.lon?, self.lat?))
    }

    /// Code used to look the village up on the detail endpoint.
    pub fn lookup_code(&self) -> Option<&str> {
        self.kdepum.as_deref().filter(|code| !code.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.namobj.as_deref()
    }

    /// Sub-district, regency and province names, in that order.
    pub fn ancestry(&self) -> [Option<&str>; 3] {
        [
            self.wadmkc.as_deref(),
            self.wadmkk.as_deref(),
            self.wadmpr.as_deref(),
        ]
    }
}

/// Lenient field deserializers for backend attributes.
mod lenient {
    use super::Geometry;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn geometry<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Geometry>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_id_from_json() {
        assert_eq!(EntityId::from_json(&json!(7)), Some(EntityId::new(7)));
        assert_eq!(EntityId::from_json(&json!(7.0)), Some(EntityId::new(7)));
        assert_eq!(EntityId::from_json(&json!("12")), Some(EntityId::new(12)));
        assert_eq!(EntityId::from_json(&json!(7.5)), None);
        assert_eq!(EntityId::from_json(&json!(null)), None);
        assert!(EntityId::new(0).is_none());
    }

    #[test]
    fn test_projection_origin() {
        let coord = LonLat::new(0.0, 0.0).to_map_coordinate();
        assert!(coord.x.abs() < 1e-6);
        assert!(coord.y.abs() < 1e-6);
    }

    #[test]
    fn test_projection_known_point() {
        // Yogyakarta, the explorer's initial center
        let coord = LonLat::new(110.3695, -7.7956).to_map_coordinate();
        assert!((coord.x - 12_286_276.5).abs() < 1.0, "x = {}", coord.x);
        assert!((coord.y - (-870_492.1)).abs() < 1.0, "y = {}", coord.y);

        let back = coord.to_lon_lat();
        assert!((back.lon - 110.3695).abs() < 1e-9);
        assert!((back.lat - (-7.7956)).abs() < 1e-9);
    }

    #[test]
    fn test_lon_lat_validity() {
        assert!(LonLat::new(110.0, -7.0).is_valid());
        assert!(!LonLat::new(181.0, 0.0).is_valid());
        assert!(!LonLat::new(0.0, 89.0).is_valid());
        assert!(!LonLat::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_entity_lenient_deserialization() {
        let entity: Entity = serde_json::from_value(json!({
            "id": 42,
            "namobj": "Caturtunggal",
            "kdepum": 3404072,
            "luaswh": "1042.5",
            "lon": 110.4,
            "lat": -7.77,
            "wadmkc": "Depok",
            "wadmkk": "Sleman",
            "wadmpr": "Daerah Istimewa Yogyakarta",
            "geom": {"type": "Polygon", "coordinates": [[[110.0, -7.0]]]},
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(entity.id, EntityId::new(42));
        assert_eq!(entity.lookup_code(), Some("3404072"));
        assert_eq!(entity.luaswh, Some(1042.5));
        assert_eq!(entity.position(), Some(LonLat::new(110.4, -7.77)));
        // Polygon depth does not match the multi-polygon layout
        assert_eq!(entity.geom, None);
        assert_eq!(
            entity.ancestry(),
            [
                Some("Depok"),
                Some("Sleman"),
                Some("Daerah Istimewa Yogyakarta")
            ]
        );
    }

    #[test]
    fn test_entity_partial_record() {
        let entity: Entity =
            serde_json::from_value(json!({"id": 3, "wadmkd": "Sinduadi"})).unwrap();
        assert_eq!(entity.id, EntityId::new(3));
        assert_eq!(entity.position(), None);
        assert_eq!(entity.lookup_code(), None);
    }

    #[test]
    fn test_geometry_counts() {
        let geom: Geometry = serde_json::from_value(json!({
            "type": "MultiPolygon",
            "coordinates": [[[[110.0, -7.0], [110.1, -7.0], [110.1, -7.1], [110.0, -7.0]]]]
        }))
        .unwrap();
        assert_eq!(geom.polygon_count(), 1);
        assert_eq!(geom.vertex_count(), 4);
    }
}
