//! # Moderation Engine
//! Wires extractors, history, aggregation, escalation, and persistence into the
//! `Analyze` operation, and exposes the detection-management operations.
//!
//! Scoring itself ([`score_content`]) is pure and can be called from any number of
//! tasks concurrently. The engine holds no in-process counters: history is read from
//! the store and every attributed submission is appended back to it through
//! [`SubmissionLog`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborators::{ActivityLog, ModerationActions, ModerationTarget, TracingCollaborators};
use crate::config::{ConfigHandle, EngineConfig};
use crate::decision::{decide, Recommendation};
use crate::detection::{
    DetectionDraft, DetectionManager, DetectionPage, DetectionQuery, DetectionRecord,
    DetectionStore, ReviewRequest, TargetType,
};
use crate::error::EngineError;
use crate::history::{HistoryEnricher, HistorySignal, HistorySource, SubmissionLog};
use crate::reporting::{Reporter, Statistics};
use crate::scoring::{aggregate, AnalysisResult};
use crate::signals::extract_signals;
use crate::store::MemoryStore;
use crate::telemetry::content_id;

fn default_persist() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub content: String,
    #[serde(default)]
    pub content_type: Option<TargetType>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub scope_id: Option<String>,
    #[serde(default)]
    pub auto_act: bool,
    /// Create a detection record for this analysis.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

impl AnalyzeRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: None,
            target_id: None,
            actor_id: None,
            scope_id: None,
            auto_act: false,
            persist: true,
        }
    }
}

/// What the caller is allowed to have the engine enact. Authorization happens upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_moderate: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionsTaken {
    pub auto_rejected: bool,
    pub queued_for_review: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub is_spam: bool,
    pub confidence: f64,
    pub score: u32,
    pub reasons: Vec<String>,
    pub detection_id: Option<String>,
    pub recommendation: Recommendation,
    pub history_used: bool,
    pub actions: ActionsTaken,
}

/// Score `content` with the given history. Same inputs, same output.
pub fn score_content(
    content: &str,
    history: Option<HistorySignal>,
    cfg: &EngineConfig,
) -> (AnalysisResult, Recommendation) {
    let signals = extract_signals(content, &cfg.lexicon);
    let result = aggregate(signals, history, &cfg.thresholds);
    let recommendation = decide(&result, &cfg.thresholds);
    (result, recommendation)
}

/// External dependencies of the engine.
pub struct EngineParts {
    pub history: Arc<dyn HistorySource>,
    pub submissions: Arc<dyn SubmissionLog>,
    pub detections: Arc<dyn DetectionStore>,
    pub actions: Arc<dyn ModerationActions>,
    pub activity: Arc<dyn ActivityLog>,
}

impl EngineParts {
    /// One in-process store for both seams, log-only collaborators.
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            history: store.clone(),
            submissions: store.clone(),
            detections: store,
            actions: Arc::new(TracingCollaborators),
            activity: Arc::new(TracingCollaborators),
        }
    }
}

#[derive(Clone)]
pub struct ModerationEngine {
    config: ConfigHandle,
    history: HistoryEnricher,
    submissions: Arc<dyn SubmissionLog>,
    detections: DetectionManager,
    reporter: Reporter,
    actions: Arc<dyn ModerationActions>,
}

impl ModerationEngine {
    pub fn new(config: ConfigHandle, parts: EngineParts) -> Self {
        Self {
            config,
            history: HistoryEnricher::new(parts.history),
            submissions: parts.submissions,
            detections: DetectionManager::new(parts.detections.clone(), parts.activity),
            reporter: Reporter::new(parts.detections),
            actions: parts.actions,
        }
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Analyze one submission.
    ///
    /// Fails with `Validation` on empty content and `Dependency` when the record cannot be
    /// persisted. A failing history lookup only drops the history bonus.
    pub async fn analyze(
        &self,
        req: AnalyzeRequest,
        caps: Capabilities,
        now: DateTime<Utc>,
    ) -> Result<AnalyzeResponse, EngineError> {
        if req.content.trim().is_empty() {
            return Err(EngineError::Validation("content is required".into()));
        }
        let cid = content_id(&req.content);
        let cfg = self.config.current();

        let history = match self
            .history
            .fetch_history(req.actor_id.as_deref(), req.scope_id.as_deref(), now)
            .await
        {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(
                    target: "moderation::engine",
                    content_id = %cid,
                    error = %e,
                    "history lookup failed, scoring without history"
                );
                metrics::counter!("moderation_history_degraded_total").increment(1);
                None
            }
        };
        let history_used = history.is_some();

        // Logged after the lookup so the counts cover earlier submissions only.
        if let Some(actor) = req.actor_id.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            if let Err(e) = self
                .submissions
                .log_submission(actor, req.scope_id.as_deref(), now)
                .await
            {
                tracing::warn!(
                    target: "moderation::engine",
                    content_id = %cid,
                    error = %e,
                    "submission log write failed"
                );
            }
        }

        let (result, recommendation) = score_content(&req.content, history, &cfg);

        let detection_id = if req.persist {
            let draft = DetectionDraft {
                content: &req.content,
                target_type: req.content_type,
                target_id: req.target_id.as_deref(),
                actor_id: req.actor_id.as_deref(),
                workspace_id: req.scope_id.as_deref(),
            };
            let record = self
                .detections
                .create(&draft, &result, recommendation, now)
                .await?;
            Some(record.id)
        } else {
            None
        };

        let target = ModerationTarget {
            target_type: req.content_type.unwrap_or(TargetType::Post),
            target_id: req.target_id.clone(),
            workspace_id: req.scope_id.clone(),
            detection_id: detection_id.clone(),
        };
        let actions = self
            .enact(recommendation, &target, &result, req.auto_act, caps, &cid)
            .await;

        tracing::info!(
            target: "moderation::engine",
            content_id = %cid,
            score = result.score,
            raw_score = result.raw_score,
            is_spam = result.is_spam,
            recommendation = recommendation.as_str(),
            history_used,
            detection_id = ?detection_id,
            "content analyzed"
        );
        metrics::counter!(
            "moderation_analyses_total",
            "recommendation" => recommendation.as_str()
        )
        .increment(1);

        Ok(AnalyzeResponse {
            is_spam: result.is_spam,
            confidence: result.confidence,
            score: result.score,
            reasons: result.reasons,
            detection_id,
            recommendation,
            history_used,
            actions,
        })
    }

    /// REJECT is enacted only with `auto_act` and the moderate capability; REVIEW always
    /// queues. Collaborator failures are logged and reported, never fatal.
    async fn enact(
        &self,
        recommendation: Recommendation,
        target: &ModerationTarget,
        result: &AnalysisResult,
        auto_act: bool,
        caps: Capabilities,
        cid: &str,
    ) -> ActionsTaken {
        let mut taken = ActionsTaken::default();
        match recommendation {
            Recommendation::Reject if auto_act && caps.can_moderate => {
                match self
                    .actions
                    .reject_target(target, &result.reasons, true)
                    .await
                {
                    Ok(()) => taken.auto_rejected = true,
                    Err(e) => tracing::warn!(
                        target: "moderation::engine",
                        content_id = %cid,
                        error = %format!("{e:#}"),
                        "automatic reject failed"
                    ),
                }
            }
            Recommendation::Reject if auto_act => {
                tracing::debug!(
                    target: "moderation::engine",
                    content_id = %cid,
                    "auto-act requested without moderate capability"
                );
            }
            Recommendation::Review => {
                match self
                    .actions
                    .enqueue_review(target, result.confidence, &result.reasons)
                    .await
                {
                    Ok(()) => taken.queued_for_review = true,
                    Err(e) => tracing::warn!(
                        target: "moderation::engine",
                        content_id = %cid,
                        error = %format!("{e:#}"),
                        "enqueue for review failed"
                    ),
                }
            }
            _ => {}
        }
        taken
    }

    pub async fn get_detection(&self, id: &str) -> Result<DetectionRecord, EngineError> {
        self.detections.get(id).await
    }

    pub async fn list_detections(&self, query: DetectionQuery) -> Result<DetectionPage, EngineError> {
        self.detections.list(query).await
    }

    pub async fn review_detection(
        &self,
        id: &str,
        request: ReviewRequest,
        now: DateTime<Utc>,
    ) -> Result<DetectionRecord, EngineError> {
        self.detections.review(id, request, now).await
    }

    pub async fn delete_detection(
        &self,
        id: &str,
        deleted_by: Option<&str>,
    ) -> Result<(), EngineError> {
        self.detections.delete(id, deleted_by).await
    }

    pub async fn statistics(
        &self,
        scope_id: Option<&str>,
        window_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Statistics, EngineError> {
        self.reporter.statistics(scope_id, window_days, now).await
    }
}
