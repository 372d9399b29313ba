//! Structured observability hooks for session lifecycle events.
//!
//! This module provides:
//! - Session-scoped tracing spans via the `SessionSpan` RAII guard
//! - Emission functions for key lifecycle events: session start/finish,
//!   violation intake, escalation triggers, oracle decisions
//!
//! Events are emitted at `info!` level and filtered via `PROCTOR_LOG`
//! (or `RUST_LOG`).

use tracing::info;

use crate::domain::{Decision, SessionStatus, Severity, ViolationKind};
use crate::escalation::EscalationTrigger;

/// RAII guard that enters a session-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = SessionSpan::enter("3fae…");
/// // All tracing calls are now associated with session_id = "3fae…"
/// ```
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    /// Create and enter a span tagged with the session id.
    pub fn enter(session_id: &str) -> Self {
        let span = tracing::info_span!("proctor.session", session_id = %session_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: session started for a candidate.
pub fn emit_session_started(session_id: &str, exam_name: &str, candidate_id: &str) {
    info!(
        event = "session.started",
        session_id = %session_id,
        exam_name = %exam_name,
        candidate_id = %candidate_id,
    );
}

/// Emit event: session left `IN_PROGRESS`.
pub fn emit_session_finished(session_id: &str, status: SessionStatus, score: f64) {
    info!(
        event = "session.finished",
        session_id = %session_id,
        status = %status,
        score = score,
    );
}

/// Emit event: a violation entered the log.
pub fn emit_violation_recorded(session_id: &str, kind: ViolationKind, severity: Severity) {
    info!(
        event = "violation.recorded",
        session_id = %session_id,
        kind = %kind,
        severity = %severity,
    );
}

/// Emit event: a threshold rule fired and an oracle call is starting.
pub fn emit_escalation_triggered(session_id: &str, trigger: EscalationTrigger, window_len: usize) {
    info!(
        event = "escalation.triggered",
        session_id = %session_id,
        trigger = %trigger,
        window_len = window_len,
    );
}

/// Emit event: the oracle resolved to a decision.
pub fn emit_oracle_decision(session_id: &str, decision: Decision, reason: Option<&str>) {
    info!(
        event = "oracle.decision",
        session_id = %session_id,
        decision = %decision,
        reason = reason.unwrap_or(""),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_span_create() {
        // Just ensure SessionSpan::enter doesn't panic
        let _span = SessionSpan::enter("test-session-id");
    }
}
