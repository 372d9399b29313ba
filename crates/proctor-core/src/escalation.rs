//! Deterministic escalation thresholds.
//!
//! A pure rule set deciding, from windowed severity counts, whether the
//! current state must be escalated to the advisory oracle. Rules are
//! evaluated in fixed precedence on every event arrival; the policy has
//! no side effects and is testable against synthetic windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Severity;
use crate::window::ViolationLog;

/// Which threshold rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    /// At least one CRITICAL event in the window.
    Critical,
    /// Major count reached the threshold.
    MajorThreshold,
    /// Warning count reached the threshold.
    WarningThreshold,
}

impl std::fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::MajorThreshold => write!(f, "major_threshold"),
            Self::WarningThreshold => write!(f, "warning_threshold"),
        }
    }
}

/// Threshold rule set evaluated first-match-wins, highest severity first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// CRITICAL events in the window that force escalation.
    pub critical_threshold: usize,
    /// MAJOR events in the window that force escalation.
    pub major_threshold: usize,
    /// WARNING events in the window that force escalation.
    pub warning_threshold: usize,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl EscalationPolicy {
    /// The production rule set: 1 CRITICAL, 3 MAJOR, or 5 WARNING within
    /// a 5-minute window.
    pub fn standard() -> Self {
        Self {
            critical_threshold: 1,
            major_threshold: 3,
            warning_threshold: 5,
            window_secs: 300,
        }
    }

    /// The window as a chrono duration.
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }

    /// Apply the rules, in exact precedence, to the windowed counts.
    ///
    /// Returns the first rule whose threshold is met, `None` when the
    /// state does not warrant escalation.
    pub fn evaluate(&self, log: &ViolationLog, now: DateTime<Utc>) -> Option<EscalationTrigger> {
        let window = self.window();
        if log.count_recent(Severity::Critical, window, now) >= self.critical_threshold {
            return Some(EscalationTrigger::Critical);
        }
        if log.count_recent(Severity::Major, window, now) >= self.major_threshold {
            return Some(EscalationTrigger::MajorThreshold);
        }
        if log.count_recent(Severity::Warning, window, now) >= self.warning_threshold {
            return Some(EscalationTrigger::WarningThreshold);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ViolationEvent, ViolationKind};

    fn log_with(counts: &[(Severity, usize)], now: DateTime<Utc>) -> ViolationLog {
        let mut log = ViolationLog::new();
        for &(severity, n) in counts {
            for _ in 0..n {
                log.append(ViolationEvent::new(
                    ViolationKind::SuspiciousMovement,
                    severity,
                    now,
                ));
            }
        }
        log
    }

    #[test]
    fn test_single_critical_escalates() {
        let now = Utc::now();
        let log = log_with(&[(Severity::Critical, 1)], now);
        assert_eq!(
            EscalationPolicy::standard().evaluate(&log, now),
            Some(EscalationTrigger::Critical)
        );
    }

    #[test]
    fn test_below_all_thresholds_does_not_escalate() {
        let now = Utc::now();
        let log = log_with(&[(Severity::Major, 2), (Severity::Warning, 4)], now);
        assert_eq!(EscalationPolicy::standard().evaluate(&log, now), None);
    }

    #[test]
    fn test_three_majors_escalate() {
        let now = Utc::now();
        let log = log_with(&[(Severity::Major, 3)], now);
        assert_eq!(
            EscalationPolicy::standard().evaluate(&log, now),
            Some(EscalationTrigger::MajorThreshold)
        );
    }

    #[test]
    fn test_five_warnings_escalate() {
        let now = Utc::now();
        let log = log_with(&[(Severity::Warning, 5)], now);
        assert_eq!(
            EscalationPolicy::standard().evaluate(&log, now),
            Some(EscalationTrigger::WarningThreshold)
        );
    }

    #[test]
    fn test_critical_takes_precedence() {
        let now = Utc::now();
        let log = log_with(&[(Severity::Critical, 1), (Severity::Major, 5)], now);
        assert_eq!(
            EscalationPolicy::standard().evaluate(&log, now),
            Some(EscalationTrigger::Critical)
        );
    }

    #[test]
    fn test_stale_events_do_not_count() {
        let now = Utc::now();
        let policy = EscalationPolicy::standard();
        let mut log = ViolationLog::new();
        for _ in 0..5 {
            log.append(ViolationEvent::new(
                ViolationKind::SpeechDetected,
                Severity::Warning,
                now - Duration::seconds(301),
            ));
        }
        assert_eq!(policy.evaluate(&log, now), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let policy = EscalationPolicy::standard();
        let json = serde_json::to_string(&policy).unwrap();
        let back: EscalationPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }
}
