//! decision.rs: escalation, (verdict, confidence) → recommended moderation action.
//!
//! The decider only recommends. Enacting a recommendation (hiding content, queueing it)
//! is the engine's job and is capability-gated there.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Thresholds;
use crate::scoring::AnalysisResult;

/// Recommended moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Approve => "APPROVE",
            Recommendation::Review => "REVIEW",
            Recommendation::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a scored result to a recommendation.
///
/// Looks at `is_spam` and `confidence` together and never assumes they move in
/// lockstep, so independently reconfigured thresholds cannot produce a REVIEW or
/// REJECT for non-spam. Both confidence comparisons are strict.
pub fn decide(result: &AnalysisResult, thresholds: &Thresholds) -> Recommendation {
    decide_parts(result.is_spam, result.confidence, thresholds)
}

pub fn decide_parts(is_spam: bool, confidence: f64, thresholds: &Thresholds) -> Recommendation {
    if !is_spam {
        return Recommendation::Approve;
    }
    if confidence > thresholds.reject_confidence {
        Recommendation::Reject
    } else if confidence > thresholds.review_confidence {
        Recommendation::Review
    } else {
        Recommendation::Approve
    }
}
