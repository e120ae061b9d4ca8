//! Search coordinator.
//!
//! Runs free-text village searches and owns the current result list. The
//! search endpoint's response shape is not validated upstream, so
//! [`normalize_search_response`] accepts the two known shapes and degrades
//! everything else to an empty list.

use crate::backend::VillageBackend;
use crate::sequence::{RequestSequence, Ticket};
use batas_core::types::Entity;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Default minimum query length, in characters.
pub const MIN_QUERY_CHARS: usize = 2;

/// What happened to one `search` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Query too short; nothing was requested and results are unchanged.
    Skipped,
    /// Results replaced with this many rows.
    Applied(usize),
    /// The request failed; results were reset to empty.
    Failed,
    /// A newer search was issued while this one was in flight; its result was dropped.
    Stale,
}

pub struct SearchCoordinator {
    backend: Arc<dyn VillageBackend>,
    results: RwLock<Vec<Entity>>,
    sequence: RequestSequence,
    min_query_chars: usize,
}

impl SearchCoordinator {
    pub fn new(backend: Arc<dyn VillageBackend>) -> Self {
        Self::with_min_query_chars(backend, MIN_QUERY_CHARS)
    }

    pub fn with_min_query_chars(
        backend: Arc<dyn VillageBackend>,
        min_query_chars: usize,
    ) -> Self {
        Self {
            backend,
            results: RwLock::new(Vec::new()),
            sequence: RequestSequence::new(),
            min_query_chars,
        }
    }

    pub fn min_query_chars(&self) -> usize {
        self.min_query_chars
    }

    /// Returns true if `query` is long enough to be sent.
    pub fn accepts(&self, query: &str) -> bool {
        query.chars().count() >= self.min_query_chars
    }

    /// Reserves a ticket for a search about to be started.
    ///
    /// Searches are ordered by ticket, so callers that run the search later
    /// (for example on a spawned task) draw the ticket when the request is made.
    pub fn issue_ticket(&self) -> Ticket {
        self.sequence.issue()
    }

    /// Runs a search and applies its result unless a newer search superseded it.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        if !self.accepts(query) {
            return self.skip(query);
        }
        let ticket = self.issue_ticket();
        self.search_with(ticket, query).await
    }

    /// Runs a search under a ticket drawn earlier with [`issue_ticket`](Self::issue_ticket).
    pub async fn search_with(&self, ticket: Ticket, query: &str) -> SearchOutcome {
        if !self.accepts(query) {
            return self.skip(query);
        }

        let fetched = self.backend.search(query).await;

        let mut results = self.results.write();
        if !self.sequence.is_current(ticket) {
            tracing::debug!(
                "Dropping stale search result for {:?} (ticket {})",
                query,
                ticket.value()
            );
            return SearchOutcome::Stale;
        }

        match fetched {
            Ok(body) => {
                *results = normalize_search_response(body);
                tracing::debug!("Search for {:?} returned {} result(s)", query, results.len());
                SearchOutcome::Applied(results.len())
            }
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {:#}", query, e);
                results.clear();
                SearchOutcome::Failed
            }
        }
    }

    fn skip(&self, query: &str) -> SearchOutcome {
        tracing::debug!(
            "Ignoring search for {:?}: shorter than {} characters",
            query,
            self.min_query_chars
        );
        SearchOutcome::Skipped
    }

    /// Snapshot of the current result list.
    pub fn results(&self) -> Vec<Entity> {
        self.results.read().clone()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }

    /// Empties the result list and drops any search still in flight.
    pub fn clear(&self) {
        let mut results = self.results.write();
        self.sequence.invalidate();
        results.clear();
    }

    /// Takes the row at `index` for activation, clearing the whole list.
    ///
    /// Returns `None` and leaves the list untouched if the index is out of range.
    pub fn take(&self, index: usize) -> Option<Entity> {
        let mut results = self.results.write();
        if index >= results.len() {
            return None;
        }
        self.sequence.invalidate();
        let row = results.swap_remove(index);
        results.clear();
        Some(row)
    }
}

impl std::fmt::Debug for SearchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCoordinator")
            .field("results", &self.results.read().len())
            .field("sequence", &self.sequence)
            .field("min_query_chars", &self.min_query_chars)
            .finish()
    }
}

/// Turns a search response body into a result list.
///
/// A bare array is the list itself; an object's `results` array is the inner
/// list; any other shape is empty. Rows that are not village records are
/// dropped.
pub fn normalize_search_response(body: Value) -> Vec<Entity> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut body) => match body.remove("results") {
            Some(Value::Array(rows)) => rows,
            _ => {
                tracing::warn!("Search response object has no results array");
                return Vec::new();
            }
        },
        other => {
            tracing::warn!("Unexpected search response: {}", other);
            return Vec::new();
        }
    };

    rows.into_iter()
        .filter_map(|row| {
            if !row.is_object() {
                tracing::warn!("Skipping non-object search row: {}", row);
                return None;
            }
            serde_json::from_value::<Entity>(row)
                .map_err(|e| tracing::warn!("Skipping malformed search row: {}", e))
                .ok()
        })
        .collect()
}
