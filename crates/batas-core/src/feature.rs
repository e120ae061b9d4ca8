//! Typed adapter for rendered map features.
//!
//! The map engine reports overlay features as an untyped attribute bag whose
//! schema is defined by the tile service. Application logic never reads that
//! bag directly; it goes through [`FlyTarget`] and [`VillageCaption`], which
//! validate what they need and reject a single malformed feature without
//! affecting anything else.

use crate::error::FeatureError;
use crate::types::{Entity, EntityId, LonLat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute bag of a rendered overlay feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureProperties(Map<String, Value>);

impl FeatureProperties {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self(properties)
    }

    /// Builds properties from a JSON object; any other value yields an empty bag.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Feature identifier, if present and not the reserved "none" value.
    pub fn id(&self) -> Option<EntityId> {
        self.get("id")
            .and_then(EntityId::from_json)
            .filter(|id| !id.is_none())
    }

    /// String property; numbers are rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numeric property; numeric strings are parsed.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for FeatureProperties {
    fn from(properties: Map<String, Value>) -> Self {
        Self(properties)
    }
}

/// Everything a fly-to needs: where to go, what to select, what to fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyTarget {
    pub position: LonLat,
    pub id: EntityId,
    /// Detail lookup code
    pub code: String,
}

impl FlyTarget {
    pub fn new(position: LonLat, id: EntityId, code: impl Into<String>) -> Self {
        Self {
            position,
            id,
            code: code.into(),
        }
    }
}

fn required_number(props: &FeatureProperties, field: &str) -> Result<f64, FeatureError> {
    match props.get(field) {
        None => Err(FeatureError::missing_field(field)),
        Some(_) => props
            .number(field)
            .filter(|n| n.is_finite())
            .ok_or_else(|| FeatureError::invalid_value(field, "expected a finite number")),
    }
}

impl TryFrom<&FeatureProperties> for FlyTarget {
    type Error = FeatureError;

    fn try_from(props: &FeatureProperties) -> Result<Self, Self::Error> {
        let id = match props.get("id") {
            None => return Err(FeatureError::missing_field("id")),
            Some(raw) => EntityId::from_json(raw)
                .filter(|id| !id.is_none())
                .ok_or_else(|| FeatureError::invalid_value("id", format!("unusable id {}", raw)))?,
        };

        let lon = required_number(props, "lon")?;
        let lat = required_number(props, "lat")?;
        let code = props
            .text("kdepum")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| FeatureError::missing_field("kdepum"))?;

        Ok(FlyTarget::new(LonLat::new(lon, lat), id, code))
    }
}

impl TryFrom<&Entity> for FlyTarget {
    type Error = FeatureError;

    fn try_from(entity: &Entity) -> Result<Self, Self::Error> {
        if entity.id.is_none() {
            return Err(FeatureError::missing_field("id"));
        }
        let position = entity
            .position()
            .ok_or_else(|| FeatureError::missing_field("lon/lat"))?;
        let code = entity
            .lookup_code()
            .ok_or_else(|| FeatureError::missing_field("kdepum"))?;

        Ok(FlyTarget::new(position, entity.id, code))
    }
}

/// Name and administrative ancestry of the village under the view center.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VillageCaption {
    pub name: Option<String>,
    pub district: Option<String>,
    pub regency: Option<String>,
    pub province: Option<String>,
}

impl VillageCaption {
    pub fn from_properties(props: &FeatureProperties) -> Self {
        Self {
            name: props.text("namobj"),
            district: props.text("wadmkc"),
            regency: props.text("wadmkk"),
            province: props.text("wadmpr"),
        }
    }
}
