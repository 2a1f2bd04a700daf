//! Settings surface — one TOML file, loaded once at startup.
//!
//! Every field has a default so a missing file (or a partial one) still
//! yields a working configuration; credential resolution happens later,
//! per advisor, with env-var fallback.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::advisor::AdvisorConfig;
use crate::debate::DebateConfig;
use crate::watcher::WatcherConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the external session server.
    pub session_url: String,
    /// Opinion + deliberation rounds before the final vote.
    pub rounds: u32,
    /// Consensus ratio required for approval.
    pub threshold: f64,
    /// Per-advisor-call timeout in seconds.
    pub call_timeout_secs: u64,
    pub autonomous_guidance: bool,
    pub fallback_messages: Vec<String>,
    pub poll_interval_secs: u64,
    pub cooldown_secs: u64,
    pub start_timeout_secs: u64,
    #[serde(rename = "advisor")]
    pub advisors: Vec<AdvisorConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_url: "http://localhost:4096".to_string(),
            rounds: 2,
            threshold: 0.5,
            call_timeout_secs: 120,
            autonomous_guidance: true,
            fallback_messages: Vec::new(),
            poll_interval_secs: 10,
            cooldown_secs: 10,
            start_timeout_secs: 30,
            advisors: Vec::new(),
        }
    }
}

impl Settings {
    /// Parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Parse a settings file, falling back to defaults when it is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "settings file not found; using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Clamp out-of-range values instead of failing startup.
    fn sanitized(mut self) -> Self {
        if self.rounds == 0 {
            warn!("rounds must be at least 1; clamping");
            self.rounds = 1;
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            warn!(threshold = self.threshold, "threshold outside [0, 1]; clamping");
            self.threshold = self.threshold.clamp(0.0, 1.0);
        }
        self
    }

    pub fn debate_config(&self) -> DebateConfig {
        DebateConfig {
            rounds: self.rounds,
            threshold: self.threshold,
            call_timeout: Duration::from_secs(self.call_timeout_secs),
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
            start_timeout: Duration::from_secs(self.start_timeout_secs),
            autonomous_guidance: self.autonomous_guidance,
            fallback_messages: self.fallback_messages.clone(),
        }
    }
}
