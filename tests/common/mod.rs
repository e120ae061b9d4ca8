//! Common test utilities and helpers for integration tests

use batas_core::AppConfig;
use batas_explorer::testing::{RecordingEngine, ScriptedBackend};
use batas_explorer::MapExplorer;
use serde_json::{json, Value};
use std::sync::Arc;

pub const TILE_TEMPLATE: &str = "http://localhost/api/v1/tiles/batas_desa/{z}/{x}/{y}.pbf";

/// A village record as the backend returns it
pub fn village(id: i64, name: &str, code: &str, lon: f64, lat: f64) -> Value {
    json!({
        "id": id,
        "kode_desa": code,
        "namobj": name,
        "kdepum": code,
        "wadmkd": name,
        "wadmkc": "Godean",
        "wadmkk": "Sleman",
        "wadmpr": "DI Yogyakarta",
        "luaswh": 245.5,
        "lon": lon,
        "lat": lat,
        "geom": {
            "type": "MultiPolygon",
            "coordinates": [[[[lon, lat], [lon + 0.01, lat], [lon, lat + 0.01], [lon, lat]]]]
        },
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": null
    })
}

/// Successful detail response wrapping `data`
pub fn detail_ok(data: Value) -> Value {
    json!({"status": true, "data": data})
}

/// Explorer over a recording engine, plus handles to inspect both doubles
pub fn explorer_with(
    backend: ScriptedBackend,
) -> (MapExplorer<RecordingEngine>, RecordingEngine, Arc<ScriptedBackend>) {
    let engine = RecordingEngine::new();
    let backend = Arc::new(backend);
    let explorer = MapExplorer::new(
        engine.clone(),
        backend.clone(),
        &AppConfig::default(),
        TILE_TEMPLATE,
    );
    (explorer, engine, backend)
}
