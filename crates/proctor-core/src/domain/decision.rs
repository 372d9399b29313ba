//! Decision tokens returned by the advisory oracle.

use serde::{Deserialize, Serialize};

/// Maximum length of a [`DecisionResult::reason`], in characters.
pub const MAX_REASON_CHARS: usize = 300;

/// The three actions the oracle may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Terminate the session after the grace delay.
    EndExam,
    /// Surface a transient warning notice; session continues.
    FlashWarning,
    /// No action.
    Ignore,
}

impl Decision {
    /// The wire token for this decision.
    pub fn token(self) -> &'static str {
        match self {
            Self::EndExam => "END_EXAM",
            Self::FlashWarning => "FLASH_WARNING",
            Self::Ignore => "IGNORE",
        }
    }

    /// Whether this decision terminates the session.
    pub fn ends_session(self) -> bool {
        matches!(self, Self::EndExam)
    }

    /// Whether applying this decision mutates session state at all.
    pub fn is_actionable(self) -> bool {
        !matches!(self, Self::Ignore)
    }

    /// All tokens, in the order the parser scans them.
    pub fn all() -> [Decision; 3] {
        [Self::EndExam, Self::FlashWarning, Self::Ignore]
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

impl std::str::FromStr for Decision {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "END_EXAM" => Ok(Self::EndExam),
            "FLASH_WARNING" => Ok(Self::FlashWarning),
            "IGNORE" => Ok(Self::Ignore),
            _ => Err(()),
        }
    }
}

/// The outcome of one oracle consultation.
///
/// Created per escalation call and never mutated afterwards; the raw reply
/// text is retained verbatim for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResult {
    /// The parsed action.
    pub decision: Decision,
    /// Optional human-readable explanation, capped at [`MAX_REASON_CHARS`].
    pub reason: Option<String>,
    /// The unmodified oracle reply text.
    pub raw: String,
}

impl DecisionResult {
    /// Create a result, enforcing the reason length cap.
    pub fn new(decision: Decision, reason: Option<String>, raw: impl Into<String>) -> Self {
        let reason = reason
            .map(|r| r.chars().take(MAX_REASON_CHARS).collect::<String>())
            .filter(|r| !r.is_empty());
        Self {
            decision,
            reason,
            raw: raw.into(),
        }
    }

    /// The fail-open result used when the oracle call itself fails.
    ///
    /// A proctoring system that fails open on oracle outage must stay
    /// fail-open: the error is captured, never propagated.
    pub fn fail_open(error: impl std::fmt::Display) -> Self {
        Self {
            decision: Decision::Ignore,
            reason: Some("LLM invoke failed".to_string()),
            raw: error.to_string(),
        }
    }
}
