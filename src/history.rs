//! history.rs: behavioral counters for the submitting actor.
//!
//! Lookups against the external store, plus the [`SubmissionLog`] append that feeds
//! them. Anonymous submissions and unknown actors get no history and are scored on
//! content alone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Lookback window for submission and violation counts.
pub const LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySignal {
    pub account_age_days: u32,
    pub recent_submission_count: u32,
    pub prior_violation_count: u32,
}

/// Store queries the enricher needs. Implementations must not mutate state.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// `None` when the actor is unknown.
    async fn account_created_at(&self, actor_id: &str) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn count_submissions(
        &self,
        actor_id: &str,
        scope_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Detections attributed to the actor that ended up `CONFIRMED`.
    async fn count_confirmed_violations(
        &self,
        actor_id: &str,
        scope_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// Write side of the history store: one entry per analyzed submission.
#[async_trait]
pub trait SubmissionLog: Send + Sync {
    /// Append a submission by `actor_id`. An actor seen for the first time is registered
    /// with `at` as its account creation time.
    async fn log_submission(
        &self,
        actor_id: &str,
        scope_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct HistoryEnricher {
    source: Arc<dyn HistorySource>,
}

impl HistoryEnricher {
    pub fn new(source: Arc<dyn HistorySource>) -> Self {
        Self { source }
    }

    /// Fetch counters for `actor_id` as of `now`.
    ///
    /// `Ok(None)` for anonymous or unknown actors. Store failures are returned as-is;
    /// the caller decides whether to degrade.
    pub async fn fetch_history(
        &self,
        actor_id: Option<&str>,
        scope_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<HistorySignal>, StoreError> {
        let Some(actor) = actor_id.map(str::trim).filter(|a| !a.is_empty()) else {
            return Ok(None);
        };
        let Some(created_at) = self.source.account_created_at(actor).await? else {
            return Ok(None);
        };

        let since = now - Duration::days(LOOKBACK_DAYS);
        let submissions = self.source.count_submissions(actor, scope_id, since).await?;
        let violations = self
            .source
            .count_confirmed_violations(actor, scope_id, since)
            .await?;

        Ok(Some(HistorySignal {
            account_age_days: age_days(created_at, now),
            recent_submission_count: saturate(submissions),
            prior_violation_count: saturate(violations),
        }))
    }
}

/// Whole days between creation and `now`; creation in the future counts as 0.
fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = (now - created_at).num_days().max(0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
