//! The spam lexicon: known phrases, link-shortener domains, and structural patterns.
//!
//! Kept as data so lists can change without touching aggregation logic.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LexiconCfg {
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default)]
    pub shorteners: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<PatternCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternCfg {
    pub id: String,
    pub pattern: String,
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub id: String,
    pub re: Regex,
}

/// Compiled lexicon consumed by the signal extractors.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    phrases: Vec<String>,
    shorteners: Vec<String>,
    patterns: Vec<CompiledPattern>,
}

impl Lexicon {
    /// Normalize lists (trim, lowercase, dedup, drop empties) and compile patterns.
    pub fn compile(cfg: LexiconCfg) -> anyhow::Result<Self> {
        let patterns = cfg
            .patterns
            .into_iter()
            .map(|p| {
                let re = Regex::new(&p.pattern)
                    .map_err(|e| anyhow::anyhow!("pattern `{}` regex error: {}", p.id, e))?;
                Ok(CompiledPattern { id: p.id, re })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            phrases: clean_list(cfg.phrases),
            shorteners: clean_list(cfg.shorteners)
                .into_iter()
                .map(|d| d.trim_start_matches("www.").to_string())
                .collect(),
            patterns,
        })
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn shorteners(&self) -> &[String] {
        &self.shorteners
    }

    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// True if `host` is a listed shortener or a subdomain of one.
    pub fn is_shortener(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let host = host.trim_start_matches("www.");
        self.shorteners.iter().any(|d| {
            host == d
                || host
                    .strip_suffix(d.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() {
            set.insert(t);
        }
    }
    set.into_iter().collect()
}
