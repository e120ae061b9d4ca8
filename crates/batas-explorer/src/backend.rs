//! Backend seam for the coordinators.
//!
//! Coordinators talk to the village service through [`VillageBackend`] so the
//! REST client can be swapped for another transport or a test double. The
//! backend only moves JSON; interpreting response shapes is the
//! coordinators' job.

use async_trait::async_trait;
use serde_json::Value;

/// Village search and detail lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VillageBackend: Send + Sync {
    /// Runs a free-text search and returns the decoded response body.
    async fn search(&self, query: &str) -> anyhow::Result<Value>;

    /// Fetches the full record for a village code and returns the decoded response body.
    async fn detail(&self, code: &str) -> anyhow::Result<Value>;
}
