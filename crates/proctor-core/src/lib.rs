//! Proctor Core Library
//!
//! Real-time exam proctoring decision engine: debounces noisy violation
//! events from signal collectors, applies deterministic escalation
//! thresholds over a sliding window, consults an advisory oracle, and
//! drives the session state machine that acts on the verdict.

pub mod config;
pub mod domain;
pub mod engine;
pub mod escalation;
pub mod export;
pub mod fakes;
pub mod limiter;
pub mod metrics;
pub mod obs;
pub mod oracle;
pub mod score;
pub mod telemetry;
pub mod window;

pub use domain::{
    Decision, DecisionResult, ExamConfig, ExamSession, ProctorError, Result, SessionStatus,
    Severity, ValidationError, ViolationEvent, ViolationKind, DEFAULT_CONFIDENCE,
    MAX_REASON_CHARS,
};

pub use config::EngineConfig;
pub use engine::{Notice, ProctoringEngine};
pub use escalation::{EscalationPolicy, EscalationTrigger};
pub use export::{
    read_report, write_report_csv, write_report_json, ProctoringReport,
};
pub use limiter::CallGate;
pub use oracle::{
    normalize_reply, parse_decision, DecisionOracle, HttpOracleClient, OracleClient, OracleConfig,
};
pub use score::integrity_score;
pub use window::ViolationLog;

pub use metrics::METRICS;
pub use obs::{
    emit_escalation_triggered, emit_oracle_decision, emit_session_finished,
    emit_session_started, emit_violation_recorded, SessionSpan,
};
pub use telemetry::init_tracing;

/// Proctor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
