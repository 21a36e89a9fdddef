//! Seams to the host application's moderation machinery.
//!
//! The engine recommends; these collaborators enact. Hosts plug in their own
//! implementations; [`TracingCollaborators`] only logs and is the default when
//! nothing is wired.

use async_trait::async_trait;
use serde::Serialize;

use crate::detection::TargetType;

/// What a moderation action applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationTarget {
    pub target_type: TargetType,
    pub target_id: Option<String>,
    pub workspace_id: Option<String>,
    pub detection_id: Option<String>,
}

#[async_trait]
pub trait ModerationActions: Send + Sync {
    /// Hide/reject the target and record a moderation action.
    async fn reject_target(
        &self,
        target: &ModerationTarget,
        reasons: &[String],
        is_automatic: bool,
    ) -> anyhow::Result<()>;

    /// Put the target in the human triage queue.
    async fn enqueue_review(
        &self,
        target: &ModerationTarget,
        confidence: f64,
        reasons: &[String],
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn detection_deleted(
        &self,
        detection_id: &str,
        deleted_by: Option<&str>,
    ) -> anyhow::Result<()>;
}

/// Log-only collaborators.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCollaborators;

#[async_trait]
impl ModerationActions for TracingCollaborators {
    async fn reject_target(
        &self,
        target: &ModerationTarget,
        reasons: &[String],
        is_automatic: bool,
    ) -> anyhow::Result<()> {
        tracing::info!(
            target: "moderation::actions",
            target_type = ?target.target_type,
            target_id = ?target.target_id,
            detection_id = ?target.detection_id,
            is_automatic,
            reasons = reasons.len(),
            "reject requested"
        );
        Ok(())
    }

    async fn enqueue_review(
        &self,
        target: &ModerationTarget,
        confidence: f64,
        reasons: &[String],
    ) -> anyhow::Result<()> {
        tracing::info!(
            target: "moderation::actions",
            target_type = ?target.target_type,
            target_id = ?target.target_id,
            detection_id = ?target.detection_id,
            confidence,
            reasons = reasons.len(),
            "queued for review"
        );
        Ok(())
    }
}

#[async_trait]
impl ActivityLog for TracingCollaborators {
    async fn detection_deleted(
        &self,
        detection_id: &str,
        deleted_by: Option<&str>,
    ) -> anyhow::Result<()> {
        tracing::info!(
            target: "moderation::activity",
            detection_id,
            deleted_by = deleted_by.unwrap_or("<unknown>"),
            "spam detection deleted"
        );
        Ok(())
    }
}
