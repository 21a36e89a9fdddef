//! Score aggregation: signals (+ optional history) → bounded score, confidence, verdict.
//!
//! Weighted additive scoring. Rules are evaluated in a fixed order, which is also the
//! order of `reasons`. A rule only appends a reason when it contributes points.

use serde::Serialize;

use crate::config::Thresholds;
use crate::history::HistorySignal;
use crate::signals::SignalSet;

pub const PHRASE_WEIGHT: u32 = 15;
pub const PATTERN_WEIGHT: u32 = 10;
pub const SHORTENER_WEIGHT: u32 = 20;
/// URLs beyond this many add `EXCESS_URL_WEIGHT` each.
pub const FREE_URLS: u32 = 3;
pub const EXCESS_URL_WEIGHT: u32 = 10;
pub const CHAR_RUN_WEIGHT: u32 = 8;
/// Strictly above this percentage of capitals.
pub const CAPS_LIMIT: f64 = 70.0;
pub const CAPS_BONUS: u32 = 15;
pub const REPEATED_WORD_WEIGHT: u32 = 5;
pub const SHORT_WITH_LINKS_BONUS: u32 = 10;
pub const FREQUENT_POSTS_LIMIT: u32 = 10;
pub const NEW_ACCOUNT_DAYS: u32 = 7;
pub const NEW_ACCOUNT_FREQUENCY_BONUS: u32 = 20;
pub const PRIOR_VIOLATIONS_LIMIT: u32 = 2;
pub const PRIOR_VIOLATIONS_BONUS: u32 = 15;
pub const CONTACT_INFO_LIMIT: u32 = 1;
pub const CONTACT_INFO_BONUS: u32 = 12;

pub const MAX_SCORE: u32 = 100;

/// Output of the scorer for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Pre-clamp weighted sum.
    pub raw_score: u32,
    /// `min(raw_score, 100)`.
    pub score: u32,
    /// `min(score / 100, confidence_cap)`.
    pub confidence: f64,
    pub is_spam: bool,
    pub reasons: Vec<String>,
    pub signals: SignalSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistorySignal>,
}

/// Combine signals and history into an [`AnalysisResult`].
pub fn aggregate(
    signals: SignalSet,
    history: Option<HistorySignal>,
    thresholds: &Thresholds,
) -> AnalysisResult {
    let mut raw: u32 = 0;
    let mut reasons: Vec<String> = Vec::new();
    let mut add = |points: u32, reason: String| {
        if points > 0 {
            raw = raw.saturating_add(points);
            reasons.push(reason);
        }
    };

    let s = &signals;

    add(
        s.phrase_matches.saturating_mul(PHRASE_WEIGHT),
        if s.matched_phrases.is_empty() {
            format!("Contains {} known spam phrase(s)", s.phrase_matches)
        } else {
            format!(
                "Contains {} known spam phrase(s): {}",
                s.phrase_matches,
                s.matched_phrases.join(", ")
            )
        },
    );
    add(
        s.pattern_matches.saturating_mul(PATTERN_WEIGHT),
        format!("Matches {} suspicious pattern(s)", s.pattern_matches),
    );
    add(
        s.suspicious_url_count.saturating_mul(SHORTENER_WEIGHT),
        format!(
            "Contains {} link(s) to URL shorteners",
            s.suspicious_url_count
        ),
    );
    if s.url_count > FREE_URLS {
        add(
            (s.url_count - FREE_URLS).saturating_mul(EXCESS_URL_WEIGHT),
            format!("Excessive URLs ({})", s.url_count),
        );
    }
    add(
        s.repeated_char_runs.saturating_mul(CHAR_RUN_WEIGHT),
        format!(
            "Repeated characters ({} run(s))",
            s.repeated_char_runs
        ),
    );
    if s.caps_percentage > CAPS_LIMIT {
        add(
            CAPS_BONUS,
            format!("Excessive capitals ({:.0}%)", s.caps_percentage),
        );
    }
    add(
        s.repeated_word_penalty_units
            .saturating_mul(REPEATED_WORD_WEIGHT),
        format!(
            "Repeated words ({} excess occurrence(s))",
            s.repeated_word_penalty_units
        ),
    );
    if s.short_with_links {
        add(
            SHORT_WITH_LINKS_BONUS,
            "Very short content containing links".to_string(),
        );
    }
    if let Some(h) = &history {
        if h.recent_submission_count > FREQUENT_POSTS_LIMIT && h.account_age_days < NEW_ACCOUNT_DAYS
        {
            add(
                NEW_ACCOUNT_FREQUENCY_BONUS,
                format!(
                    "High posting frequency from new account ({} posts, {} day(s) old)",
                    h.recent_submission_count, h.account_age_days
                ),
            );
        }
        if h.prior_violation_count > PRIOR_VIOLATIONS_LIMIT {
            add(
                PRIOR_VIOLATIONS_BONUS,
                format!(
                    "User has previous violations ({})",
                    h.prior_violation_count
                ),
            );
        }
    }
    if s.contact_info_count > CONTACT_INFO_LIMIT {
        add(
            CONTACT_INFO_BONUS,
            format!(
                "Multiple contact details ({} email(s), {} phone number(s))",
                s.email_count, s.phone_count
            ),
        );
    }

    let score = raw.min(MAX_SCORE);
    AnalysisResult {
        raw_score: raw,
        score,
        confidence: confidence_for(score, thresholds),
        is_spam: score >= thresholds.spam_score,
        reasons,
        signals,
        history,
    }
}

/// `score / 100`, capped so the engine never reports full certainty.
pub fn confidence_for(score: u32, thresholds: &Thresholds) -> f64 {
    (f64::from(score.min(MAX_SCORE)) / 100.0).min(thresholds.confidence_cap)
}
