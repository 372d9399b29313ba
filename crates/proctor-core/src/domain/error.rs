//! Domain-level error taxonomy.

use super::session::SessionStatus;

/// Errors produced by event boundary validation.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown violation kind: {kind}")]
    UnknownKind { kind: String },

    #[error("confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { value: f64 },
}

/// Proctoring engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ProctorError {
    #[error("invalid transition: cannot {action} while session is {from}")]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },

    #[error("no session has been started")]
    NoSession,

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ProctorError>;
