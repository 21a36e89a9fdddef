// src/signals.rs
//! Signal extractors: pure scans over raw submission text.
//!
//! Every rule is evaluated on every call and produces a countable or boolean
//! observation. No I/O, no errors; the empty string yields an all-zero set.
//! Overlaps between rules are not deduplicated (a phone number counts both as a
//! structural pattern and as contact info).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::Lexicon;

/// `http(s)://` links, plus scheme-less `host.tld/path` links such as `bit.ly/x`.
/// A scheme-less match right after `@` is the domain of an email address and is
/// dropped by [`analyze_urls`].
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\bhttps?://[^\s<>"']+|\b(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}/[^\s<>"']*"#,
    )
    .expect("url regex")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\b\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b")
        .expect("phone regex")
});

/// Minimum length of a same-character run.
pub const CHAR_RUN_MIN: usize = 5;
/// Words must be longer than this (in chars) to count toward repetition.
pub const WORD_MIN_LEN: usize = 3;
/// Occurrences above this add one penalty unit each.
pub const WORD_FREE_OCCURRENCES: u32 = 3;
/// Content shorter than this (in chars) that carries a link is flagged.
pub const SHORT_CONTENT_LEN: usize = 20;

/// Per-pattern match count, kept for record metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternHit {
    pub id: String,
    pub count: u32,
}

/// Everything the extractors observed in one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSet {
    pub phrase_matches: u32,
    pub pattern_matches: u32,
    pub url_count: u32,
    pub suspicious_url_count: u32,
    pub repeated_char_runs: u32,
    pub caps_percentage: f64,
    pub repeated_word_penalty_units: u32,
    pub email_count: u32,
    pub phone_count: u32,
    pub contact_info_count: u32,
    pub short_with_links: bool,

    /// Distinct phrases found, in lexicon order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_phrases: Vec<String>,
    /// Patterns with at least one match, in lexicon order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pattern_hits: Vec<PatternHit>,
}

/// Run every extractor over `text`.
pub fn extract_signals(text: &str, lexicon: &Lexicon) -> SignalSet {
    let lower = text.to_lowercase();

    let matched_phrases = match_phrases(&lower, lexicon);
    let pattern_hits = match_patterns(text, lexicon);
    let (url_count, suspicious_url_count) = analyze_urls(text, lexicon);
    let email_count = EMAIL_RE.find_iter(text).count() as u32;
    let phone_count = PHONE_RE.find_iter(text).count() as u32;

    SignalSet {
        phrase_matches: matched_phrases.len() as u32,
        pattern_matches: pattern_hits.iter().map(|h| h.count).sum(),
        url_count,
        suspicious_url_count,
        repeated_char_runs: count_char_runs(text, CHAR_RUN_MIN),
        caps_percentage: caps_percentage(text),
        repeated_word_penalty_units: repeated_word_penalty(&lower),
        email_count,
        phone_count,
        contact_info_count: email_count + phone_count,
        short_with_links: text.chars().count() < SHORT_CONTENT_LEN && url_count > 0,
        matched_phrases,
        pattern_hits,
    }
}

/// Each distinct phrase counts once, regardless of how often it occurs.
fn match_phrases(lower: &str, lexicon: &Lexicon) -> Vec<String> {
    lexicon
        .phrases()
        .iter()
        .filter(|p| lower.contains(p.as_str()))
        .cloned()
        .collect()
}

/// Each pattern contributes the number of matches it finds.
fn match_patterns(text: &str, lexicon: &Lexicon) -> Vec<PatternHit> {
    lexicon
        .patterns()
        .iter()
        .filter_map(|p| {
            let count = p.re.find_iter(text).count() as u32;
            (count > 0).then(|| PatternHit {
                id: p.id.clone(),
                count,
            })
        })
        .collect()
}

/// Returns `(total urls, urls pointing at a known shortener)`.
fn analyze_urls(text: &str, lexicon: &Lexicon) -> (u32, u32) {
    let mut total = 0;
    let mut suspicious = 0;
    for m in URL_RE.find_iter(text) {
        if text[..m.start()].ends_with('@') {
            continue;
        }
        total += 1;
        if let Some(host) = url_host(m.as_str()) {
            if lexicon.is_shortener(&host) {
                suspicious += 1;
            }
        }
    }
    (total, suspicious)
}

/// Lowercased host of a matched URL (scheme, userinfo, port, and path stripped).
pub(crate) fn url_host(url: &str) -> Option<String> {
    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = host_port.split(':').next()?.trim_end_matches('.');
    (!host.is_empty()).then(|| host.to_string())
}

/// Runs of one character repeated `min` or more times in a row; a run counts once.
fn count_char_runs(text: &str, min: usize) -> u32 {
    let mut runs = 0;
    let mut prev: Option<char> = None;
    let mut len = 0usize;
    for ch in text.chars() {
        if Some(ch) == prev {
            len += 1;
        } else {
            prev = Some(ch);
            len = 1;
        }
        if len == min {
            runs += 1;
        }
    }
    runs
}

/// Share of ASCII capitals among ASCII letters, in percent. Zero letters → 0.
fn caps_percentage(text: &str) -> f64 {
    let (upper, alpha) = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .fold((0u32, 0u32), |(u, a), c| {
            (u + u32::from(c.is_ascii_uppercase()), a + 1)
        });
    if alpha == 0 {
        return 0.0;
    }
    100.0 * f64::from(upper) / f64::from(alpha)
}

/// Sum of `(occurrences - 3)` over every word longer than 3 chars seen more than 3 times.
fn repeated_word_penalty(lower: &str) -> u32 {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for w in lower.split_whitespace() {
        if w.chars().count() > WORD_MIN_LEN {
            *counts.entry(w).or_insert(0) += 1;
        }
    }
    counts
        .values()
        .filter(|&&n| n > WORD_FREE_OCCURRENCES)
        .map(|n| n - WORD_FREE_OCCURRENCES)
        .sum()
}
