//! Text shown by the explorer's panels.
//!
//! Pure formatting. Labels are Indonesian, matching the data's source.

use crate::detail::DetailRecord;
use batas_core::feature::VillageCaption;
use batas_core::types::Entity;
use serde_json::{Map, Value};
use std::fmt;

pub const CAPTION_PLACEHOLDER: &str = "Geser peta untuk melihat nama desa di tengah.";
pub const CAPTION_NO_VILLAGE: &str = "Tidak ada desa di tengah peta";
pub const UNKNOWN_VILLAGE: &str = "Tidak diketahui";
pub const DETAIL_TITLE_FALLBACK: &str = "Detail Desa";

/// Attributes never shown in the detail panel.
pub const HIDDEN_FIELDS: [&str; 3] = ["geom", "created_at", "updated_at"];

/// Human-readable label of a known attribute.
pub fn field_label(key: &str) -> Option<&'static str> {
    let label = match key {
        "id" => "ID",
        "kode_desa" => "Kode Desa",
        "namobj" => "Nama Desa",
        "fcode" => "Kode Fitur",
        "remark" => "Keterangan",
        "metadata" => "Metadata",
        "srs_id" => "SRS ID",
        "kdbbps" => "Kode BPS",
        "kdcbps" => "Kode CBPS",
        "kdcpum" => "Kode CPUM",
        "kdebps" => "Kode EBPS",
        "kdepum" => "Kode EPUM",
        "kdpbps" => "Kode PBPS",
        "kdpkab" => "Kode PKAB",
        "kdppum" => "Kode PPUM",
        "luaswh" => "Luas (Ha)",
        "tipadm" => "Tipe Administrasi",
        "wadmkc" => "Kecamatan",
        "wadmkd" => "Desa/Kelurahan",
        "wadmkk" => "Kabupaten/Kota",
        "wadmpr" => "Provinsi",
        "wiadkc" => "Kode Kecamatan",
        "wiadkk" => "Kode Kabupaten",
        "wiadpr" => "Kode Provinsi",
        "wiadkd" => "Kode Desa",
        "uupp" => "UUPP",
        "shape_leng" => "Panjang Bentuk",
        "shape_area" => "Luas Bentuk",
        _ => return None,
    };
    Some(label)
}

/// Label of an attribute, falling back to the raw key.
pub fn label_for(key: &str) -> &str {
    field_label(key).unwrap_or(key)
}

pub fn is_hidden_field(key: &str) -> bool {
    HIDDEN_FIELDS.contains(&key)
}

/// Renders an attribute value as panel text.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// One line of the detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// Panel rows for a set of attributes, in their original order.
pub fn detail_rows(attributes: &Map<String, Value>) -> Vec<DetailRow> {
    attributes
        .iter()
        .filter(|(key, value)| !is_hidden_field(key) && !value.is_null())
        .map(|(key, value)| DetailRow {
            key: key.clone(),
            label: label_for(key).to_string(),
            value: format_value(value),
        })
        .collect()
}

pub fn detail_title(record: &DetailRecord) -> &str {
    record
        .entity
        .name()
        .filter(|name| !name.is_empty())
        .unwrap_or(DETAIL_TITLE_FALLBACK)
}

/// Label of a search result row: village, sub-district, regency, province.
pub fn result_label(entity: &Entity) -> String {
    [
        entity.wadmkd.as_deref(),
        entity.wadmkc.as_deref(),
        entity.wadmkk.as_deref(),
        entity.wadmpr.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Informational caption about the village under the view center.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Caption {
    /// The map has not moved yet.
    #[default]
    Placeholder,
    Village(VillageCaption),
    NoVillage,
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caption::Placeholder => f.write_str(CAPTION_PLACEHOLDER),
            Caption::NoVillage => f.write_str(CAPTION_NO_VILLAGE),
            Caption::Village(village) => {
                let name = village.name.as_deref().unwrap_or(UNKNOWN_VILLAGE);
                write!(f, "Desa: {}", name)?;

                let ancestry: Vec<&str> = [&village.district, &village.regency, &village.province]
                    .into_iter()
                    .filter_map(|part| part.as_deref())
                    .collect();
                if !ancestry.is_empty() {
                    write!(f, " ({})", ancestry.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(label_for("namobj"), "Nama Desa");
        assert_eq!(label_for("luaswh"), "Luas (Ha)");
        assert_eq!(label_for("wiadkd"), "Kode Desa");
        assert_eq!(label_for("area_km2"), "area_km2");
        assert_eq!(field_label("lon"), None);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("Godean")), "Godean");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!(12.0)), "12");
        assert_eq!(format_value(&json!(245.5)), "245.5");
        assert_eq!(format_value(&json!(true)), "true");
        assert_eq!(format_value(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_detail_rows_skip_hidden_and_null() {
        let attrs = attributes(json!({
            "id": 42,
            "namobj": "Sidoarum",
            "geom": {"type": "MultiPolygon", "coordinates": []},
            "remark": null,
            "created_at": "2024-01-01",
            "updated_at": "2024-02-01",
            "area_km2": 2.45
        }));

        let rows = detail_rows(&attrs);
        let keys: Vec<_> = rows.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, ["id", "namobj", "area_km2"]);
        assert_eq!(rows[1].label, "Nama Desa");
        assert_eq!(rows[2].label, "area_km2");
        assert_eq!(rows[2].value, "2.45");
    }

    #[test]
    fn test_detail_title() {
        let named =
            DetailRecord::from_attributes(attributes(json!({"id": 1, "namobj": "Sidoarum"})))
                .unwrap();
        let unnamed = DetailRecord::from_attributes(attributes(json!({"id": 1}))).unwrap();
        assert_eq!(detail_title(&named), "Sidoarum");
        assert_eq!(detail_title(&unnamed), DETAIL_TITLE_FALLBACK);
    }

    #[test]
    fn test_result_label() {
        let entity: Entity = serde_json::from_value(json!({
            "id": 1,
            "wadmkd": "Sidoarum",
            "wadmkc": "Godean",
            "wadmkk": "Sleman",
            "wadmpr": "DI Yogyakarta"
        }))
        .unwrap();
        assert_eq!(result_label(&entity), "Sidoarum, Godean, Sleman, DI Yogyakarta");

        let partial: Entity = serde_json::from_value(json!({
            "id": 2,
            "wadmkd": "Sidoarum",
            "wadmpr": "DI Yogyakarta"
        }))
        .unwrap();
        assert_eq!(result_label(&partial), "Sidoarum, DI Yogyakarta");
    }

    #[test]
    fn test_caption_text() {
        assert_eq!(Caption::Placeholder.to_string(), CAPTION_PLACEHOLDER);
        assert_eq!(Caption::NoVillage.to_string(), "Tidak ada desa di tengah peta");

        let village = VillageCaption {
            name: Some("Sidoarum".into()),
            district: Some("Godean".into()),
            regency: Some("Sleman".into()),
            province: Some("DI Yogyakarta".into()),
        };
        assert_eq!(
            Caption::Village(village).to_string(),
            "Desa: Sidoarum (Godean, Sleman, DI Yogyakarta)"
        );

        let unnamed = VillageCaption {
            district: Some("Godean".into()),
            ..Default::default()
        };
        assert_eq!(Caption::Village(unnamed).to_string(), "Desa: Tidak diketahui (Godean)");
    }
}
