//! Reporting over persisted detection records: totals, accuracy, per-day trend.
//!
//! `accuracy` counts every adjudicated outcome (confirmed spam or false positive) as
//! resolved; `PENDING` is the only unresolved state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::detection::{DetectionRecord, DetectionStatus, DetectionStore};
use crate::error::EngineError;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const MAX_WINDOW_DAYS: u32 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub total: u64,
    pub spam: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub window_days: u32,
    pub total_detections: u64,
    pub confirmed_spam: u64,
    pub pending_review: u64,
    pub false_positives: u64,
    pub auto_detected: u64,
    /// Percent of records in a resolved state, 0 when there are none.
    pub accuracy: f64,
    /// One entry per UTC day in the window, oldest first, zero-filled.
    pub daily_trend: Vec<DailyTrend>,
}

pub fn clamp_window(days: Option<u32>) -> u32 {
    days.unwrap_or(DEFAULT_WINDOW_DAYS).clamp(1, MAX_WINDOW_DAYS)
}

/// Pure aggregation over records already restricted to the window.
pub fn summarize(records: &[DetectionRecord], window_days: u32, now: DateTime<Utc>) -> Statistics {
    let since = now - Duration::days(i64::from(window_days));

    let mut confirmed = 0u64;
    let mut pending = 0u64;
    let mut false_pos = 0u64;
    let mut auto = 0u64;

    let mut days: BTreeMap<NaiveDate, DailyTrend> = BTreeMap::new();
    let mut day = since.date_naive();
    let last = now.date_naive();
    while day <= last {
        days.insert(
            day,
            DailyTrend {
                date: day,
                total: 0,
                spam: 0,
            },
        );
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    for r in records {
        match r.status {
            DetectionStatus::Confirmed => confirmed += 1,
            DetectionStatus::Pending => pending += 1,
            DetectionStatus::FalsePositive => false_pos += 1,
        }
        if r.auto_detected {
            auto += 1;
        }
        if let Some(slot) = days.get_mut(&r.created_at.date_naive()) {
            slot.total += 1;
            if r.status == DetectionStatus::Confirmed {
                slot.spam += 1;
            }
        }
    }

    let total = records.len() as u64;
    let accuracy = if total == 0 {
        0.0
    } else {
        (confirmed + false_pos) as f64 / total as f64 * 100.0
    };

    Statistics {
        window_days,
        total_detections: total,
        confirmed_spam: confirmed,
        pending_review: pending,
        false_positives: false_pos,
        auto_detected: auto,
        accuracy,
        daily_trend: days.into_values().collect(),
    }
}

#[derive(Clone)]
pub struct Reporter {
    store: Arc<dyn DetectionStore>,
}

impl Reporter {
    pub fn new(store: Arc<dyn DetectionStore>) -> Self {
        Self { store }
    }

    pub async fn statistics(
        &self,
        scope_id: Option<&str>,
        window_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Statistics, EngineError> {
        let window_days = clamp_window(window_days);
        let since = now - Duration::days(i64::from(window_days));
        let records = self.store.window(scope_id, since).await?;
        Ok(summarize(&records, window_days, now))
    }
}
