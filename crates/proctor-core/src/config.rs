//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::escalation::EscalationPolicy;

/// Tunables for the proctoring engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Escalation thresholds and window length.
    pub policy: EscalationPolicy,
    /// Minimum interval between oracle consultations, in seconds.
    pub cooldown_secs: u64,
    /// Delay between an `END_EXAM` decision and the actual termination,
    /// in milliseconds, so observers can react.
    pub termination_grace_ms: u64,
    /// How long a `FLASH_WARNING` notice stays visible, in milliseconds.
    pub notice_ttl_ms: u64,
    /// Optional cap on retained events; `None` keeps the full history
    /// until session end.
    pub retention_cap: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: EscalationPolicy::standard(),
            cooldown_secs: 30,
            termination_grace_ms: 2_000,
            notice_ttl_ms: 6_000,
            retention_cap: None,
        }
    }
}

impl EngineConfig {
    /// Build a config from `PROCTOR_*` environment variables, falling
    /// back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_u64("PROCTOR_WINDOW_SECS") {
            config.policy.window_secs = secs;
        }
        if let Some(secs) = env_u64("PROCTOR_COOLDOWN_SECS") {
            config.cooldown_secs = secs;
        }
        if let Some(ms) = env_u64("PROCTOR_GRACE_MS") {
            config.termination_grace_ms = ms;
        }
        if let Some(ms) = env_u64("PROCTOR_NOTICE_TTL_MS") {
            config.notice_ttl_ms = ms;
        }
        if let Some(cap) = env_u64("PROCTOR_RETENTION_CAP") {
            config.retention_cap = Some(cap as usize);
        }
        config
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
