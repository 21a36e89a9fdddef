/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};

use super::EngineConfig;

/// A threadsafe handle to the active configuration.
/// Readers get a cheap `Arc` snapshot; a reload swaps the whole config at once so a
/// single analysis never sees half-old, half-new lists.
#[derive(Clone, Debug)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<EngineConfig>>>,
}

impl ConfigHandle {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(cfg))),
        }
    }

    /// Current snapshot. A poisoned lock still yields the last stored config.
    pub fn current(&self) -> Arc<EngineConfig> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, cfg: EngineConfig) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Arc::new(cfg),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(cfg),
        }
    }
}

/// Returns true if we should enable hot reload (dev/local only).
fn hot_reload_enabled() -> bool {
    let want = std::env::var("MODERATION_HOT_RELOAD")
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Start a polling watcher on `path` that reloads into `handle`.
/// Polls mtime every 2s; a file that fails to parse keeps the previous config.
pub fn start_hot_reload_thread(handle: ConfigHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            if let Ok(mtime) = fs::metadata(&path).and_then(|m| m.modified()) {
                let changed = match last_mtime {
                    None => {
                        last_mtime = Some(mtime);
                        false
                    }
                    Some(prev) => mtime > prev,
                };
                if changed {
                    match EngineConfig::from_path(&path) {
                        Ok(mut cfg) => {
                            cfg.thresholds = cfg.thresholds.with_env_overrides();
                            handle.replace(cfg);
                            tracing::info!(
                                target: "moderation::config",
                                path = %path.display(),
                                "config reloaded"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                target: "moderation::config",
                                error = %format!("{e:#}"),
                                "config reload failed, keeping previous"
                            );
                        }
                    }
                    last_mtime = Some(mtime);
                }
            }
            thread::sleep(poll);
        }
    });
}
