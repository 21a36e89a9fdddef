// tests/thresholds.rs
//
// Score boundaries at 40 and 70, and thresholds reconfigured independently
// of the score↔confidence relationship.

use std::sync::Arc;

use chrono::Utc;

use moderation_scorer::config::{ConfigHandle, EngineConfig, Thresholds};
use moderation_scorer::decision::decide;
use moderation_scorer::scoring::aggregate;
use moderation_scorer::signals::SignalSet;
use moderation_scorer::{
    AnalyzeRequest, Capabilities, EngineParts, MemoryStore, ModerationEngine, Recommendation,
};

fn signals(shorteners: u32, patterns: u32, phrases: u32) -> SignalSet {
    SignalSet {
        suspicious_url_count: shorteners,
        url_count: shorteners,
        pattern_matches: patterns,
        phrase_matches: phrases,
        ..Default::default()
    }
}

#[test]
fn score_boundaries_map_to_expected_actions() {
    let t = Thresholds::default();
    // (signals, expected score, expected spam, expected recommendation)
    let cases = [
        (signals(1, 1, 0), 30, false, Recommendation::Approve),
        (signals(0, 1, 2), 40, true, Recommendation::Approve),
        (signals(0, 4, 1), 55, true, Recommendation::Review),
        (signals(3, 1, 0), 70, true, Recommendation::Review),
        (signals(0, 7, 0), 70, true, Recommendation::Review),
        (signals(3, 0, 1), 75, true, Recommendation::Reject),
    ];
    for (s, score, spam, rec) in cases {
        let r = aggregate(s, None, &t);
        assert_eq!(r.score, score);
        assert_eq!(r.is_spam, spam, "score {score}");
        assert_eq!(decide(&r, &t), rec, "score {score}");
    }
}

#[test]
fn confidence_never_exceeds_cap() {
    let t = Thresholds::default();
    let r = aggregate(signals(10, 10, 10), None, &t);
    assert_eq!(r.score, 100);
    assert!(r.raw_score > 100);
    assert_eq!(r.confidence, 0.95);
}

#[test]
fn lowered_spam_threshold_does_not_escalate_low_confidence() {
    let t = Thresholds {
        spam_score: 20,
        ..Thresholds::default()
    };
    let r = aggregate(signals(0, 3, 0), None, &t);
    assert_eq!(r.score, 30);
    assert!(r.is_spam);
    assert_eq!(decide(&r, &t), Recommendation::Approve);
}

#[test]
fn raised_spam_threshold_keeps_non_spam_approved() {
    let t = Thresholds {
        spam_score: 90,
        ..Thresholds::default()
    };
    let r = aggregate(signals(4, 0, 0), None, &t);
    assert_eq!(r.score, 90);
    assert!(r.is_spam);
    assert_eq!(decide(&r, &t), Recommendation::Reject);

    let r = aggregate(signals(4, 0, 0), None, &Thresholds { spam_score: 91, ..t });
    assert!(!r.is_spam);
    assert_eq!(decide(&r, &t), Recommendation::Approve);
}

#[tokio::test]
async fn replaced_config_takes_effect_on_next_call() {
    let handle = ConfigHandle::new(EngineConfig::default_seed().unwrap());
    let engine = ModerationEngine::new(
        handle.clone(),
        EngineParts::in_memory(Arc::new(MemoryStore::new())),
    );
    let text = "https://bit.ly/a https://bit.ly/b";

    let before = engine
        .analyze(AnalyzeRequest::new(text), Capabilities::default(), Utc::now())
        .await
        .unwrap();
    assert!(before.is_spam);

    let mut stricter = EngineConfig::default_seed().unwrap();
    stricter.thresholds.spam_score = 50;
    handle.replace(stricter);

    let after = engine
        .analyze(AnalyzeRequest::new(text), Capabilities::default(), Utc::now())
        .await
        .unwrap();
    assert_eq!(after.score, before.score);
    assert!(!after.is_spam);
}
