//! Detection records: the persisted outcome of one analysis and its review lifecycle.
//!
//! States: `CONFIRMED`, `PENDING`, `FALSE_POSITIVE`. A record is created with the
//! automated verdict (`CONFIRMED` for spam, `FALSE_POSITIVE` otherwise) and only moves
//! through explicit reviews. Every review appends one immutable audit entry; entries
//! are never merged, rewritten, or removed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborators::ActivityLog;
use crate::decision::Recommendation;
use crate::error::{EngineError, StoreError};
use crate::history::HistorySignal;
use crate::scoring::AnalysisResult;
use crate::signals::SignalSet;

/// Stored excerpt length, in chars.
pub const EXCERPT_CHARS: usize = 1000;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_LIST_WINDOW_DAYS: u32 = 30;
/// Longest lookback a listing accepts, in days.
pub const MAX_LIST_WINDOW_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetType {
    Post,
    Reply,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionStatus {
    Confirmed,
    Pending,
    FalsePositive,
}

impl DetectionStatus {
    /// Creation-time status reflects the machine verdict, never `PENDING`.
    pub fn initial(is_spam: bool) -> Self {
        if is_spam {
            DetectionStatus::Confirmed
        } else {
            DetectionStatus::FalsePositive
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetectionStatus::Confirmed => "CONFIRMED",
            DetectionStatus::Pending => "PENDING",
            DetectionStatus::FalsePositive => "FALSE_POSITIVE",
        }
    }
}

/// One human status decision. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub reviewer_id: String,
    pub reviewed_at: DateTime<Utc>,
    pub previous_status: DetectionStatus,
    pub new_status: DetectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionMetadata {
    pub raw_score: u32,
    pub score: u32,
    pub recommendation: Recommendation,
    pub signals: SignalSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistorySignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub id: String,
    pub workspace_id: Option<String>,
    pub target_type: TargetType,
    pub target_id: Option<String>,
    pub actor_id: Option<String>,
    pub content_excerpt: String,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub metadata: DetectionMetadata,
    pub status: DetectionStatus,
    pub auto_detected: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    review_history: Vec<ReviewEntry>,
    /// Bumped on every successful review; used for optimistic concurrency.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied context for a new record.
#[derive(Debug, Clone, Default)]
pub struct DetectionDraft<'a> {
    pub content: &'a str,
    pub target_type: Option<TargetType>,
    pub target_id: Option<&'a str>,
    pub actor_id: Option<&'a str>,
    pub workspace_id: Option<&'a str>,
}

/// A human status decision before it is stamped with the previous status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub new_status: DetectionStatus,
    pub reviewer_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

impl DetectionRecord {
    pub fn from_analysis(
        draft: &DetectionDraft<'_>,
        result: &AnalysisResult,
        recommendation: Recommendation,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workspace_id: draft.workspace_id.map(str::to_string),
            target_type: draft.target_type.unwrap_or(TargetType::Post),
            target_id: draft.target_id.map(str::to_string),
            actor_id: draft.actor_id.map(str::to_string),
            content_excerpt: excerpt(draft.content),
            confidence: result.confidence,
            reasons: result.reasons.clone(),
            metadata: DetectionMetadata {
                raw_score: result.raw_score,
                score: result.score,
                recommendation,
                signals: result.signals.clone(),
                history: result.history,
            },
            status: DetectionStatus::initial(result.is_spam),
            auto_detected: true,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            review_history: Vec::new(),
            revision: 1,
            created_at: now,
        }
    }

    /// Read-only view of the audit trail, oldest first.
    pub fn review_history(&self) -> &[ReviewEntry] {
        &self.review_history
    }

    /// Apply one review: update status fields and append the audit entry.
    /// Stores call this while holding the record exclusively.
    pub fn apply_review(&mut self, request: &ReviewRequest, now: DateTime<Utc>) {
        let entry = ReviewEntry {
            reviewer_id: request.reviewer_id.clone(),
            reviewed_at: now,
            previous_status: self.status,
            new_status: request.new_status,
            notes: request.notes.clone(),
        };
        self.status = request.new_status;
        self.reviewed_by = Some(request.reviewer_id.clone());
        self.reviewed_at = Some(now);
        self.review_notes = request.notes.clone();
        self.review_history.push(entry);
        self.revision += 1;
    }
}

fn excerpt(content: &str) -> String {
    content.chars().take(EXCERPT_CHARS).collect()
}

/// Filter + pagination for listings. Normalize with [`DetectionQuery::normalized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionQuery {
    pub scope_id: Option<String>,
    pub status: Option<DetectionStatus>,
    pub since: DateTime<Utc>,
    pub limit: usize,
    pub offset: usize,
}

impl DetectionQuery {
    /// Defaults: last 30 days, 20 per page.
    pub fn recent(now: DateTime<Utc>) -> Self {
        Self::since_days(now, DEFAULT_LIST_WINDOW_DAYS)
    }

    /// Records from the last `days` days, clamped to `[0, MAX_LIST_WINDOW_DAYS]`.
    pub fn since_days(now: DateTime<Utc>, days: u32) -> Self {
        let days = days.min(MAX_LIST_WINDOW_DAYS);
        Self {
            scope_id: None,
            status: None,
            since: now - Duration::days(i64::from(days)),
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn matches(&self, record: &DetectionRecord) -> bool {
        record.created_at >= self.since
            && self.status.map_or(true, |s| record.status == s)
            && scope_matches(self.scope_id.as_deref(), record)
    }
}

pub(crate) fn scope_matches(scope_id: Option<&str>, record: &DetectionRecord) -> bool {
    scope_id.map_or(true, |s| record.workspace_id.as_deref() == Some(s))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionPage {
    pub records: Vec<DetectionRecord>,
    pub pagination: Pagination,
}

/// Persistence seam for detection records.
#[async_trait]
pub trait DetectionStore: Send + Sync {
    async fn insert(&self, record: DetectionRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<DetectionRecord>, StoreError>;

    /// Matching records newest first, sliced by `limit`/`offset`, plus the total match count.
    async fn list(&self, query: &DetectionQuery)
        -> Result<(Vec<DetectionRecord>, usize), StoreError>;

    /// All records created at or after `since`, optionally scoped.
    async fn window(
        &self,
        scope_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<DetectionRecord>, StoreError>;

    /// Atomically check `expected_revision` (if given) and apply the review.
    async fn apply_review(
        &self,
        id: &str,
        request: &ReviewRequest,
        now: DateTime<Utc>,
    ) -> Result<DetectionRecord, StoreError>;

    /// `Ok(false)` when nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// Owns the detection record lifecycle.
#[derive(Clone)]
pub struct DetectionManager {
    store: Arc<dyn DetectionStore>,
    activity: Arc<dyn ActivityLog>,
}

impl DetectionManager {
    pub fn new(store: Arc<dyn DetectionStore>, activity: Arc<dyn ActivityLog>) -> Self {
        Self { store, activity }
    }

    pub fn store(&self) -> &Arc<dyn DetectionStore> {
        &self.store
    }

    pub async fn create(
        &self,
        draft: &DetectionDraft<'_>,
        result: &AnalysisResult,
        recommendation: Recommendation,
        now: DateTime<Utc>,
    ) -> Result<DetectionRecord, EngineError> {
        let record = DetectionRecord::from_analysis(draft, result, recommendation, now);
        self.store
            .insert(record.clone())
            .await
            .map_err(|e| EngineError::Dependency(e.to_string()))?;
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<DetectionRecord, EngineError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    pub async fn list(&self, query: DetectionQuery) -> Result<DetectionPage, EngineError> {
        let query = query.normalized();
        let (records, total) = self.store.list(&query).await?;
        Ok(DetectionPage {
            pagination: Pagination {
                total,
                limit: query.limit,
                offset: query.offset,
                has_more: query.offset + records.len() < total,
            },
            records,
        })
    }

    pub async fn review(
        &self,
        id: &str,
        request: ReviewRequest,
        now: DateTime<Utc>,
    ) -> Result<DetectionRecord, EngineError> {
        if request.reviewer_id.trim().is_empty() {
            return Err(EngineError::Validation("reviewer id is required".into()));
        }
        let record = self.store.apply_review(id, &request, now).await?;
        tracing::info!(
            target: "moderation::detection",
            detection_id = %record.id,
            reviewer = %request.reviewer_id,
            status = record.status.as_str(),
            revision = record.revision,
            "detection reviewed"
        );
        metrics::counter!("moderation_reviews_total", "status" => record.status.as_str())
            .increment(1);
        Ok(record)
    }

    pub async fn delete(&self, id: &str, deleted_by: Option<&str>) -> Result<(), EngineError> {
        if !self.store.delete(id).await? {
            return Err(EngineError::NotFound(id.to_string()));
        }
        tracing::info!(target: "moderation::detection", detection_id = %id, "detection deleted");
        metrics::counter!("moderation_detections_deleted_total").increment(1);
        if let Err(e) = self.activity.detection_deleted(id, deleted_by).await {
            tracing::warn!(
                target: "moderation::detection",
                detection_id = %id,
                error = %e,
                "activity event for delete failed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::scoring::aggregate;

    fn spam_result() -> AnalysisResult {
        aggregate(
            SignalSet {
                phrase_matches: 3,
                ..Default::default()
            },
            None,
            &Thresholds::default(),
        )
    }

    fn draft(content: &str) -> DetectionDraft<'_> {
        DetectionDraft {
            content,
            target_type: Some(TargetType::Reply),
            target_id: Some("r-1"),
            actor_id: Some("u-1"),
            workspace_id: Some("ws-1"),
        }
    }

    #[test]
    fn initial_status_follows_machine_verdict() {
        assert_eq!(DetectionStatus::initial(true), DetectionStatus::Confirmed);
        assert_eq!(DetectionStatus::initial(false), DetectionStatus::FalsePositive);
    }

    #[test]
    fn record_from_analysis_truncates_excerpt() {
        let long = "é".repeat(1500);
        let r = DetectionRecord::from_analysis(
            &draft(&long),
            &spam_result(),
            Recommendation::Review,
            Utc::now(),
        );
        assert_eq!(r.content_excerpt.chars().count(), EXCERPT_CHARS);
        assert_eq!(r.status, DetectionStatus::Confirmed);
        assert!(r.auto_detected);
        assert_eq!(r.revision, 1);
        assert_eq!(r.metadata.score, 45);
        assert!(r.review_history().is_empty());
    }

    #[test]
    fn reviews_append_and_never_rewrite() {
        let mut r = DetectionRecord::from_analysis(
            &draft("x"),
            &spam_result(),
            Recommendation::Review,
            Utc::now(),
        );
        let t0 = Utc::now();
        r.apply_review(
            &ReviewRequest {
                new_status: DetectionStatus::FalsePositive,
                reviewer_id: "mod-a".into(),
                notes: Some("legit".into()),
                expected_revision: None,
            },
            t0,
        );
        let first = r.review_history()[0].clone();
        r.apply_review(
            &ReviewRequest {
                new_status: DetectionStatus::FalsePositive,
                reviewer_id: "mod-b".into(),
                notes: None,
                expected_revision: None,
            },
            t0 + Duration::seconds(5),
        );

        assert_eq!(r.review_history().len(), 2);
        assert_eq!(r.review_history()[0], first);
        assert_eq!(first.previous_status, DetectionStatus::Confirmed);
        assert_eq!(r.review_history()[1].previous_status, DetectionStatus::FalsePositive);
        assert_eq!(r.reviewed_by.as_deref(), Some("mod-b"));
        assert_eq!(r.review_notes, None);
        assert_eq!(r.revision, 3);
    }

    #[test]
    fn query_limit_is_clamped() {
        let mut q = DetectionQuery::recent(Utc::now());
        q.limit = 0;
        assert_eq!(q.clone().normalized().limit, 1);
        q.limit = 10_000;
        assert_eq!(q.normalized().limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn listing_lookback_is_clamped() {
        let now = Utc::now();
        let q = DetectionQuery::since_days(now, u32::MAX);
        assert_eq!(q.since, now - Duration::days(i64::from(MAX_LIST_WINDOW_DAYS)));
        assert_eq!(DetectionQuery::since_days(now, 0).since, now);
        assert_eq!(
            DetectionQuery::recent(now).since,
            now - Duration::days(30)
        );
    }

    #[test]
    fn statuses_serialize_screaming() {
        let v = serde_json::to_value(DetectionStatus::FalsePositive).unwrap();
        assert_eq!(v, serde_json::json!("FALSE_POSITIVE"));
        let parsed: DetectionStatus = serde_json::from_str("\"PENDING\"").unwrap();
        assert_eq!(parsed, DetectionStatus::Pending);
    }
}
