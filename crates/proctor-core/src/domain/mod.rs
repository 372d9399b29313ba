//! Core domain types for the proctoring engine.

pub mod decision;
pub mod error;
pub mod session;
pub mod violation;

pub use decision::{Decision, DecisionResult, MAX_REASON_CHARS};
pub use error::{ProctorError, Result, ValidationError};
pub use session::{ExamConfig, ExamSession, SessionStatus};
pub use violation::{Severity, ViolationEvent, ViolationKind, DEFAULT_CONFIDENCE};
