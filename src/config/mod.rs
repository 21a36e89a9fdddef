// src/config/mod.rs
//! Engine configuration: the spam lexicon (phrases, shorteners, structural patterns)
//! and the classification/escalation thresholds.
//!
//! Loaded from TOML. Resolution order:
//! 1) `$MODERATION_CONFIG_PATH`
//! 2) `config/moderation.toml`
//! 3) built-in seed (the shipped `config/moderation.toml`, embedded at build time)
//!
//! Threshold env overrides are applied on top of whatever was loaded.

pub mod lexicon;
pub mod reload;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use lexicon::{CompiledPattern, Lexicon, LexiconCfg, PatternCfg};
pub use reload::{start_hot_reload_thread, ConfigHandle};

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/moderation.toml";
pub const ENV_CONFIG_PATH: &str = "MODERATION_CONFIG_PATH";
pub const ENV_SPAM_SCORE: &str = "MODERATION_SPAM_SCORE";
pub const ENV_REJECT_CONFIDENCE: &str = "MODERATION_REJECT_CONFIDENCE";
pub const ENV_REVIEW_CONFIDENCE: &str = "MODERATION_REVIEW_CONFIDENCE";

const SEED_TOML: &str = include_str!("../../config/moderation.toml");

fn default_spam_score() -> u32 {
    40
}
fn default_reject_confidence() -> f64 {
    0.7
}
fn default_review_confidence() -> f64 {
    0.4
}
fn default_confidence_cap() -> f64 {
    0.95
}

/// Classification and escalation thresholds.
///
/// The escalation comparisons are strict (`> reject_confidence`, `> review_confidence`);
/// the spam threshold is inclusive (`score >= spam_score`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_spam_score")]
    pub spam_score: u32,
    #[serde(default = "default_reject_confidence")]
    pub reject_confidence: f64,
    #[serde(default = "default_review_confidence")]
    pub review_confidence: f64,
    #[serde(default = "default_confidence_cap")]
    pub confidence_cap: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            spam_score: default_spam_score(),
            reject_confidence: default_reject_confidence(),
            review_confidence: default_review_confidence(),
            confidence_cap: default_confidence_cap(),
        }
    }
}

impl Thresholds {
    /// Clamp confidences into [0,1]; non-finite values fall back to defaults.
    pub fn sanitized(mut self) -> Self {
        fn fix(v: f64, d: f64) -> f64 {
            if v.is_finite() {
                v.clamp(0.0, 1.0)
            } else {
                d
            }
        }
        self.reject_confidence = fix(self.reject_confidence, default_reject_confidence());
        self.review_confidence = fix(self.review_confidence, default_review_confidence());
        self.confidence_cap = fix(self.confidence_cap, default_confidence_cap());
        self.spam_score = self.spam_score.min(100);
        self
    }

    /// Apply `MODERATION_*` env overrides. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = parse_env::<u32>(ENV_SPAM_SCORE) {
            self.spam_score = v;
        }
        if let Some(v) = parse_env::<f64>(ENV_REJECT_CONFIDENCE) {
            self.reject_confidence = v;
        }
        if let Some(v) = parse_env::<f64>(ENV_REVIEW_CONFIDENCE) {
            self.review_confidence = v;
        }
        self.sanitized()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct ConfigRoot {
    #[serde(default)]
    thresholds: Thresholds,
    lexicon: LexiconCfg,
}

/// Compiled, ready-to-use configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub lexicon: Lexicon,
}

impl EngineConfig {
    /// Parse and compile a TOML document.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let root: ConfigRoot = toml::from_str(toml_str).context("parsing moderation config")?;
        let lexicon = Lexicon::compile(root.lexicon)?;
        Ok(Self {
            thresholds: root.thresholds.sanitized(),
            lexicon,
        })
    }

    /// The configuration shipped with the crate.
    pub fn default_seed() -> anyhow::Result<Self> {
        Self::from_toml_str(SEED_TOML)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading moderation config at {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file (env → default path → seed) and apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::from_path(Path::new(&p))?,
            Err(_) => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_path(&default)?
                } else {
                    tracing::info!(
                        target: "moderation::config",
                        "no config file found, using built-in seed"
                    );
                    Self::default_seed()?
                }
            }
        };
        cfg.thresholds = cfg.thresholds.with_env_overrides();
        Ok(cfg)
    }

    /// Path the loader would read from, used by the hot-reload watcher.
    pub fn resolved_path() -> PathBuf {
        std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}
