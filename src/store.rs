//! In-process store implementing the history and detection seams.
//!
//! Used by the binary and the tests. Each record is mutated under the write lock, so a
//! review's revision check and audit append are atomic per record.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::detection::{
    scope_matches, DetectionQuery, DetectionRecord, DetectionStatus, DetectionStore,
    ReviewRequest,
};
use crate::error::StoreError;
use crate::history::{HistorySource, SubmissionLog};

#[derive(Debug, Clone)]
struct Submission {
    actor_id: String,
    scope_id: Option<String>,
    at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, DateTime<Utc>>,
    submissions: Vec<Submission>,
    detections: HashMap<String, DetectionRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    /// Register (or re-date) an account.
    pub fn register_account(
        &self,
        actor_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write()?
            .accounts
            .insert(actor_id.to_string(), created_at);
        Ok(())
    }

    /// Record that `actor_id` submitted content, optionally inside a workspace.
    pub fn record_submission(
        &self,
        actor_id: &str,
        scope_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write()?.submissions.push(Submission {
            actor_id: actor_id.to_string(),
            scope_id: scope_id.map(str::to_string),
            at,
        });
        Ok(())
    }

    pub fn detection_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.detections.len())
    }
}

#[async_trait]
impl HistorySource for MemoryStore {
    async fn account_created_at(&self, actor_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.read()?.accounts.get(actor_id).copied())
    }

    async fn count_submissions(
        &self,
        actor_id: &str,
        scope_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let inner = self.read()?;
        let n = inner
            .submissions
            .iter()
            .filter(|s| {
                s.actor_id == actor_id
                    && s.at >= since
                    && scope_id.map_or(true, |sc| s.scope_id.as_deref() == Some(sc))
            })
            .count();
        Ok(n as u64)
    }

    async fn count_confirmed_violations(
        &self,
        actor_id: &str,
        scope_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let inner = self.read()?;
        let n = inner
            .detections
            .values()
            .filter(|d| {
                d.actor_id.as_deref() == Some(actor_id)
                    && d.status == DetectionStatus::Confirmed
                    && d.created_at >= since
                    && scope_matches(scope_id, d)
            })
            .count();
        Ok(n as u64)
    }
}

#[async_trait]
impl SubmissionLog for MemoryStore {
    async fn log_submission(
        &self,
        actor_id: &str,
        scope_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.accounts.entry(actor_id.to_string()).or_insert(at);
        inner.submissions.push(Submission {
            actor_id: actor_id.to_string(),
            scope_id: scope_id.map(str::to_string),
            at,
        });
        Ok(())
    }
}

#[async_trait]
impl DetectionStore for MemoryStore {
    async fn insert(&self, record: DetectionRecord) -> Result<(), StoreError> {
        self.write()?.detections.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<DetectionRecord>, StoreError> {
        Ok(self.read()?.detections.get(id).cloned())
    }

    async fn list(
        &self,
        query: &DetectionQuery,
    ) -> Result<(Vec<DetectionRecord>, usize), StoreError> {
        let inner = self.read()?;
        let mut hits: Vec<&DetectionRecord> = inner
            .detections
            .values()
            .filter(|d| query.matches(d))
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let total = hits.len();
        let page = hits
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn window(
        &self,
        scope_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<DetectionRecord>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .detections
            .values()
            .filter(|d| d.created_at >= since && scope_matches(scope_id, d))
            .cloned()
            .collect())
    }

    async fn apply_review(
        &self,
        id: &str,
        request: &ReviewRequest,
        now: DateTime<Utc>,
    ) -> Result<DetectionRecord, StoreError> {
        let mut inner = self.write()?;
        let record = inner
            .detections
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(expected) = request.expected_revision {
            if expected != record.revision {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: record.revision,
                });
            }
        }
        record.apply_review(request, now);
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.write()?.detections.remove(id).is_some())
    }
}
