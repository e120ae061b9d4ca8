//! Detail coordinator.
//!
//! Fetches the full record of the selected village and owns the detail panel
//! state. Every call performs a fresh request; nothing is cached.

use crate::backend::VillageBackend;
use crate::sequence::{RequestSequence, Ticket};
use anyhow::{anyhow, Context, Result};
use batas_core::types::{Entity, EntityId};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A fetched village record.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRecord {
    pub entity: Entity,
    /// Raw attributes in server order, for presentation
    pub attributes: Map<String, Value>,
}

impl DetailRecord {
    /// Builds a record from the `data` object of a detail response.
    ///
    /// An identifier that is not an integer is left out of the typed entity
    /// (which then carries [`EntityId::NONE`]); the raw attributes keep it, so
    /// the panel still shows it.
    pub fn from_attributes(attributes: Map<String, Value>) -> Result<Self> {
        let entity = match serde_json::from_value(Value::Object(attributes.clone())) {
            Ok(entity) => entity,
            Err(e) => {
                tracing::debug!("Detail id is not an entity id ({}), keeping raw attributes", e);
                let mut typed = attributes.clone();
                typed.remove("id");
                serde_json::from_value(Value::Object(typed))
                    .context("Detail data is not a village record")?
            }
        };
        Ok(Self { entity, attributes })
    }
}

/// Extracts the record from a `{status, data}` detail response.
pub fn parse_detail_response(body: Value) -> Result<DetailRecord> {
    let mut body = match body {
        Value::Object(body) => body,
        other => return Err(anyhow!("Detail response is not an object: {}", other)),
    };

    let ok = body.get("status").and_then(Value::as_bool).unwrap_or(false);
    if !ok {
        return Err(anyhow!(
            "Detail request reported failure (status: {})",
            body.get("status").unwrap_or(&Value::Null)
        ));
    }

    match body.remove("data") {
        Some(Value::Object(data)) => DetailRecord::from_attributes(data),
        Some(other) => Err(anyhow!("Detail data is not an object: {}", other)),
        None => Err(anyhow!("Detail response has no data")),
    }
}

/// What happened to one `fetch_detail` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    /// Record replaced and panel shown.
    Applied,
    /// Record cleared and panel hidden.
    Failed,
    /// Superseded by a newer fetch; nothing changed.
    Stale,
}

#[derive(Debug, Default)]
struct PanelState {
    record: Option<DetailRecord>,
    visible: bool,
}

pub struct DetailCoordinator {
    backend: Arc<dyn VillageBackend>,
    state: RwLock<PanelState>,
    sequence: RequestSequence,
}

impl DetailCoordinator {
    pub fn new(backend: Arc<dyn VillageBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(PanelState::default()),
            sequence: RequestSequence::new(),
        }
    }

    /// Reserves a ticket for a fetch about to be started.
    pub fn issue_ticket(&self) -> Ticket {
        self.sequence.issue()
    }

    /// Fetches the record for `code` and applies it unless a newer fetch superseded it.
    pub async fn fetch_detail(&self, code: &str) -> DetailOutcome {
        let ticket = self.issue_ticket();
        self.fetch_detail_with(ticket, code).await
    }

    /// Fetches under a ticket drawn earlier with [`issue_ticket`](Self::issue_ticket).
    pub async fn fetch_detail_with(&self, ticket: Ticket, code: &str) -> DetailOutcome {
        let fetched = self
            .backend
            .detail(code)
            .await
            .and_then(parse_detail_response);

        let mut state = self.state.write();
        if !self.sequence.is_current(ticket) {
            tracing::debug!("Dropping stale detail for {} (ticket {})", code, ticket.value());
            return DetailOutcome::Stale;
        }

        match fetched {
            Ok(record) => {
                tracing::debug!("Loaded detail for {}", code);
                state.record = Some(record);
                state.visible = true;
                DetailOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("Failed to load detail for {}: {:#}", code, e);
                state.record = None;
                state.visible = false;
                DetailOutcome::Failed
            }
        }
    }

    /// The current record, whether or not the panel shows it.
    pub fn record(&self) -> Option<DetailRecord> {
        self.state.read().record.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.state.read().visible
    }

    /// The record the panel shows, if it is open.
    pub fn visible_record(&self) -> Option<DetailRecord> {
        let state = self.state.read();
        state.record.clone().filter(|_| state.visible)
    }

    /// Hides the panel. The record is kept.
    pub fn close_panel(&self) {
        self.state.write().visible = false;
    }
}

impl std::fmt::Debug for DetailCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DetailCoordinator")
            .field("has_record", &state.record.is_some())
            .field("visible", &state.visible)
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockVillageBackend;
    use serde_json::json;

    fn detail_body() -> Value {
        json!({
            "status": true,
            "data": {
                "id": 42,
                "namobj": "Sidoarum",
                "kdepum": "330101",
                "wadmkc": "Godean",
                "luaswh": "245.5",
                "created_at": "2024-01-01T00:00:00Z"
            }
        })
    }

    #[test]
    fn test_parse_detail_response() {
        let record = parse_detail_response(detail_body()).unwrap();
        assert_eq!(record.entity.id, EntityId::new(42));
        assert_eq!(record.entity.luaswh, Some(245.5));
        assert_eq!(record.attributes.get("namobj"), Some(&json!("Sidoarum")));
        let keys: Vec<_> = record.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "namobj", "kdepum", "wadmkc", "luaswh", "created_at"]);
    }

    #[test]
    fn test_parse_detail_rejects_failures() {
        assert!(parse_detail_response(json!({"status": false, "data": {"id": 1}})).is_err());
        assert!(parse_detail_response(json!({"data": {"id": 1}})).is_err());
        assert!(parse_detail_response(json!({"status": true})).is_err());
        assert!(parse_detail_response(json!({"status": true, "data": [1]})).is_err());
        assert!(parse_detail_response(json!([])).is_err());
    }

    #[test]
    fn test_non_integer_id_keeps_attributes() {
        let record = parse_detail_response(json!({
            "status": true,
            "data": {"id": "V-01", "namobj": "Sidoarum", "luaswh": "245.5"}
        }))
        .unwrap();
        assert_eq!(record.entity.id, EntityId::NONE);
        assert_eq!(record.entity.namobj.as_deref(), Some("Sidoarum"));
        assert_eq!(record.entity.luaswh, Some(245.5));
        assert_eq!(record.attributes.get("id"), Some(&json!("V-01")));

        let record = parse_detail_response(json!({"status": true, "data": {"id": 7.5}})).unwrap();
        assert_eq!(record.entity.id, EntityId::NONE);
        assert_eq!(record.attributes.get("id"), Some(&json!(7.5)));
    }

    #[tokio::test]
    async fn test_fetch_applies_and_shows() {
        let mut mock = MockVillageBackend::new();
        mock.expect_detail()
            .withf(|code| code == "330101")
            .times(1)
            .returning(|_| Ok(detail_body()));
        let detail = DetailCoordinator::new(Arc::new(mock));

        assert!(!detail.is_visible());
        assert_eq!(detail.fetch_detail("330101").await, DetailOutcome::Applied);
        assert!(detail.is_visible());

        let expected = parse_detail_response(detail_body()).unwrap();
        assert_eq!(detail.record(), Some(expected.clone()));
        assert_eq!(detail.visible_record(), Some(expected));
    }

    #[tokio::test]
    async fn test_fetch_failure_clears_and_hides() {
        let mut mock = MockVillageBackend::new();
        let mut calls = 0;
        mock.expect_detail().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(detail_body())
            } else {
                Err(anyhow!("503 Service Unavailable"))
            }
        });
        let detail = DetailCoordinator::new(Arc::new(mock));

        detail.fetch_detail("330101").await;
        assert_eq!(detail.fetch_detail("330102").await, DetailOutcome::Failed);
        assert_eq!(detail.record(), None);
        assert!(!detail.is_visible());
    }

    #[tokio::test]
    async fn test_status_false_counts_as_failure() {
        let mut mock = MockVillageBackend::new();
        mock.expect_detail()
            .returning(|_| Ok(json!({"status": false, "message": "not found"})));
        let detail = DetailCoordinator::new(Arc::new(mock));

        assert_eq!(detail.fetch_detail("999").await, DetailOutcome::Failed);
        assert_eq!(detail.record(), None);
    }

    #[tokio::test]
    async fn test_every_call_fetches() {
        let mut mock = MockVillageBackend::new();
        mock.expect_detail().times(3).returning(|_| Ok(detail_body()));
        let detail = DetailCoordinator::new(Arc::new(mock));

        for _ in 0..3 {
            assert_eq!(detail.fetch_detail("330101").await, DetailOutcome::Applied);
        }
    }

    #[tokio::test]
    async fn test_older_ticket_is_stale() {
        let mut mock = MockVillageBackend::new();
        mock.expect_detail().times(2).returning(|_| Ok(detail_body()));
        let detail = DetailCoordinator::new(Arc::new(mock));

        let first = detail.issue_ticket();
        let second = detail.issue_ticket();

        assert_eq!(detail.fetch_detail_with(second, "B").await, DetailOutcome::Applied);
        assert_eq!(detail.fetch_detail_with(first, "A").await, DetailOutcome::Stale);
        assert!(detail.is_visible());
    }

    #[tokio::test]
    async fn test_close_panel_keeps_record() {
        let mut mock = MockVillageBackend::new();
        mock.expect_detail().returning(|_| Ok(detail_body()));
        let detail = DetailCoordinator::new(Arc::new(mock));
        detail.fetch_detail("330101").await;

        detail.close_panel();
        assert!(!detail.is_visible());
        assert!(detail.record().is_some());
        assert!(detail.visible_record().is_none());

        detail.fetch_detail("330101").await;
        assert!(detail.is_visible());
    }
}
