//! Session state machine and escalation driver.
//!
//! The engine owns the session, the violation log, and the cooldown gate
//! behind a single mutex; count queries never observe a torn append. The
//! oracle call is the only suspension point: it runs in a spawned task
//! against the windowed snapshot captured at claim time, and its effect
//! re-validates the session epoch before mutating anything. Delayed
//! effects (termination grace, notice expiry) are epoch- or
//! sequence-tagged tasks, so a stale timer from a prior session never
//! mutates a newer one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::domain::{
    Decision, DecisionResult, ExamConfig, ExamSession, ProctorError, Result, SessionStatus,
    ViolationEvent,
};
use crate::export::ProctoringReport;
use crate::limiter::CallGate;
use crate::metrics::METRICS;
use crate::obs;
use crate::oracle::{DecisionOracle, OracleClient};
use crate::score::integrity_score;
use crate::window::ViolationLog;

/// Transient operator-visible warning surfaced by a `FLASH_WARNING`
/// decision. Self-clears after the configured TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub text: String,
    pub issued_at: DateTime<Utc>,
}

/// Default notice text when the oracle gave no reason.
const DEFAULT_NOTICE_TEXT: &str = "Major rule violation detected";

struct EngineState {
    session: Option<ExamSession>,
    log: ViolationLog,
    gate: CallGate,
    /// Bumped on every transition into or out of `IN_PROGRESS`. Scheduled
    /// effects capture it and abort when it has moved on.
    epoch: u64,
    notice: Option<Notice>,
    notice_seq: u64,
    last_decision: Option<DecisionResult>,
}

/// Snapshot handed to a spawned oracle call.
struct OracleJob {
    snapshot: Vec<ViolationEvent>,
    epoch: u64,
}

/// The proctoring engine.
///
/// Cheap to clone; clones share state. Methods that launch delayed
/// effects (`emit_violation`, `apply_decision`) must run inside a Tokio
/// runtime.
#[derive(Clone)]
pub struct ProctoringEngine {
    config: EngineConfig,
    oracle: DecisionOracle,
    state: Arc<Mutex<EngineState>>,
}

impl ProctoringEngine {
    pub fn new(config: EngineConfig, client: Arc<dyn OracleClient>) -> Self {
        let log = match config.retention_cap {
            Some(cap) => ViolationLog::with_retention_cap(cap),
            None => ViolationLog::new(),
        };
        let gate = CallGate::new(config.cooldown_secs);
        Self {
            config,
            oracle: DecisionOracle::new(client),
            state: Arc::new(Mutex::new(EngineState {
                session: None,
                log,
                gate,
                epoch: 0,
                notice: None,
                notice_seq: 0,
                last_decision: None,
            })),
        }
    }

    /// Start a new session.
    ///
    /// # Errors
    ///
    /// Returns `ProctorError::InvalidTransition` while another session is
    /// `IN_PROGRESS` — the operator must end it first.
    pub fn start_session(&self, exam: ExamConfig) -> Result<ExamSession> {
        let now = Utc::now();
        let mut st = self.state.lock().unwrap();
        if let Some(current) = &st.session {
            if current.status.is_active() {
                return Err(ProctorError::InvalidTransition {
                    from: current.status,
                    action: "start a session",
                });
            }
        }
        let session = ExamSession::start(exam, now);
        st.log.clear();
        st.gate.reset();
        st.epoch += 1;
        st.notice = None;
        st.last_decision = None;
        st.session = Some(session.clone());
        obs::emit_session_started(
            &session.id.to_string(),
            &session.exam_name,
            &session.candidate_id,
        );
        Ok(session)
    }

    /// End the session (operator-initiated).
    ///
    /// Bumps the epoch, so an in-flight oracle call or pending
    /// termination is discarded.
    ///
    /// # Errors
    ///
    /// Returns `ProctorError::NoSession` when nothing was started and
    /// `ProctorError::InvalidTransition` when the session already ended.
    pub fn end_session(&self) -> Result<ExamSession> {
        let now = Utc::now();
        let mut st = self.state.lock().unwrap();
        let score = integrity_score(st.log.all());
        let session = st.session.as_mut().ok_or(ProctorError::NoSession)?;
        if !session.status.is_active() {
            return Err(ProctorError::InvalidTransition {
                from: session.status,
                action: "end the session",
            });
        }
        session.status = SessionStatus::Completed;
        session.end_time = Some(now);
        let snapshot = session.clone();
        st.epoch += 1;
        st.notice = None;
        obs::emit_session_finished(&snapshot.id.to_string(), snapshot.status, score);
        Ok(snapshot)
    }

    /// Inbound contract for signal collectors: append-only, never blocks,
    /// never rejects a well-formed event.
    ///
    /// Malformed events (confidence outside [0, 1]) are dropped at this
    /// boundary with a warning; they never enter the log. When the new
    /// event pushes a windowed count over a threshold and the cooldown
    /// gate is open, an oracle consultation is launched on a snapshot of
    /// the window.
    pub fn emit_violation(&self, event: ViolationEvent) {
        if let Err(e) = event.validate() {
            METRICS.inc_events_rejected();
            warn!(error = %e, kind = %event.kind, "malformed violation rejected at boundary");
            return;
        }

        let now = Utc::now();
        let job = {
            let mut st = self.state.lock().unwrap();
            let session_id = st
                .session
                .as_ref()
                .map(|s| s.id.to_string())
                .unwrap_or_default();
            obs::emit_violation_recorded(&session_id, event.kind, event.severity);
            st.log.append(event);
            METRICS.inc_events_recorded();
            self.escalation_job(&mut st, now)
        };

        if let Some(job) = job {
            self.spawn_oracle_call(job);
        }
    }

    /// Evaluate thresholds and claim the gate. Returns the snapshot to
    /// send when a consultation should start.
    fn escalation_job(&self, st: &mut EngineState, now: DateTime<Utc>) -> Option<OracleJob> {
        let session = st.session.as_ref()?;
        if !session.status.is_active() {
            return None;
        }
        let trigger = self.config.policy.evaluate(&st.log, now)?;
        if !st.gate.try_claim(now) {
            METRICS.inc_escalations_suppressed();
            debug!(trigger = %trigger, "escalation suppressed by cooldown");
            return None;
        }
        let snapshot = st.log.recent(self.config.policy.window(), now);
        obs::emit_escalation_triggered(&session.id.to_string(), trigger, snapshot.len());
        Some(OracleJob {
            snapshot,
            epoch: st.epoch,
        })
    }

    fn spawn_oracle_call(&self, job: OracleJob) {
        let engine = self.clone();
        tokio::spawn(async move {
            let result = engine.oracle.analyze(&job.snapshot).await;
            engine.apply_decision_for_epoch(result, job.epoch);
        });
    }

    /// Apply a decision against the current session.
    ///
    /// A silent discard when the session is no longer `IN_PROGRESS`:
    /// decisions arrive asynchronously and may legitimately race a
    /// session end.
    pub fn apply_decision(&self, result: DecisionResult) {
        let epoch = self.state.lock().unwrap().epoch;
        self.apply_decision_for_epoch(result, epoch);
    }

    fn apply_decision_for_epoch(&self, result: DecisionResult, epoch: u64) {
        let now = Utc::now();
        let mut st = self.state.lock().unwrap();
        if st.epoch != epoch {
            debug!("stale oracle result discarded");
            return;
        }
        let Some(session) = st.session.as_ref() else {
            return;
        };
        if !session.status.is_active() {
            return;
        }
        let session_id = session.id.to_string();
        let _span = obs::SessionSpan::enter(&session_id);
        obs::emit_oracle_decision(&session_id, result.decision, result.reason.as_deref());

        match result.decision {
            Decision::EndExam => {
                st.log.append(ViolationEvent::decision_event(
                    Decision::EndExam,
                    result.reason.clone(),
                    now,
                ));
                st.last_decision = Some(result);
                let grace = self.config.termination_grace_ms;
                let engine = self.clone();
                drop(st);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(grace)).await;
                    engine.terminate_if_current(epoch);
                });
            }
            Decision::FlashWarning => {
                st.log.append(ViolationEvent::decision_event(
                    Decision::FlashWarning,
                    result.reason.clone(),
                    now,
                ));
                let text = result
                    .reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NOTICE_TEXT.to_string());
                st.notice = Some(Notice {
                    text,
                    issued_at: now,
                });
                st.notice_seq += 1;
                let seq = st.notice_seq;
                st.last_decision = Some(result);
                let ttl = self.config.notice_ttl_ms;
                let engine = self.clone();
                drop(st);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(ttl)).await;
                    engine.clear_notice_if_current(seq);
                });
            }
            Decision::Ignore => {
                st.last_decision = Some(result);
            }
        }
    }

    /// Delayed `END_EXAM` effect. A no-op when the session was
    /// independently ended during the grace delay.
    fn terminate_if_current(&self, epoch: u64) {
        let now = Utc::now();
        let mut st = self.state.lock().unwrap();
        if st.epoch != epoch {
            debug!("pending termination cancelled");
            return;
        }
        let score = integrity_score(st.log.all());
        let Some(session) = st.session.as_mut() else {
            return;
        };
        if !session.status.is_active() {
            return;
        }
        session.status = SessionStatus::Terminated;
        session.end_time = Some(now);
        let session_id = session.id.to_string();
        let status = session.status;
        st.epoch += 1;
        st.notice = None;
        obs::emit_session_finished(&session_id, status, score);
    }

    fn clear_notice_if_current(&self, seq: u64) {
        let mut st = self.state.lock().unwrap();
        if st.notice_seq == seq {
            st.notice = None;
        }
    }

    // -- session control surface ------------------------------------------

    /// Current session status; `NOT_STARTED` when nothing was started.
    pub fn status(&self) -> SessionStatus {
        self.state
            .lock()
            .unwrap()
            .session
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(SessionStatus::NotStarted)
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<ExamSession> {
        self.state.lock().unwrap().session.clone()
    }

    /// Integrity score recomputed from the full violation log.
    pub fn score(&self) -> f64 {
        integrity_score(self.state.lock().unwrap().log.all())
    }

    /// The full violation log in insertion order.
    pub fn violations(&self) -> Vec<ViolationEvent> {
        self.state.lock().unwrap().log.all().to_vec()
    }

    /// The transient warning notice, if one is currently visible.
    pub fn current_notice(&self) -> Option<Notice> {
        self.state.lock().unwrap().notice.clone()
    }

    /// The most recent oracle decision applied to this session.
    pub fn last_decision(&self) -> Option<DecisionResult> {
        self.state.lock().unwrap().last_decision.clone()
    }

    /// Produce an audit report of the current state.
    pub fn export_report(&self) -> ProctoringReport {
        let st = self.state.lock().unwrap();
        ProctoringReport::finalize(st.session.clone(), st.log.all().to_vec(), Utc::now())
    }
}
