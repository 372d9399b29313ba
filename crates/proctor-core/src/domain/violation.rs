//! Violation events — the record type flowing through the whole pipeline.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::decision::Decision;
use super::error::ValidationError;

/// Confidence assigned to an event when the collector does not report one.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Severity of a violation, ordered `WARNING < MAJOR < CRITICAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Minor anomaly — logged, scored lightly.
    ///
    /// Some collectors emit the legacy `MINOR` tag for this tier.
    #[serde(alias = "MINOR")]
    Warning,
    /// Significant anomaly that contributes toward escalation.
    Major,
    /// Severe anomaly — a single occurrence escalates.
    Critical,
}

impl Severity {
    /// Score deduction applied per event of this severity, scaled by
    /// the event's confidence.
    pub fn deduction(self) -> f64 {
        match self {
            Self::Warning => 3.0,
            Self::Major => 8.0,
            Self::Critical => 15.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Major => write!(f, "MAJOR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Classification of a violation event.
///
/// Collector-emitted kinds serialize as their SCREAMING_SNAKE_CASE wire
/// tags; engine-emitted decisions serialize as `AGENT_DECISION:<token>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    NoFaceDetected,
    MultipleFaces,
    FaceTurnedAway,
    LeftFrame,
    GazeOffScreen,
    SpeechDetected,
    MultipleVoices,
    BackgroundNoise,
    LipAudioMismatch,
    TabSwitch,
    CopyPasteAttempt,
    ObjectDetected,
    SuspiciousMovement,
    /// Synthetic event recording an oracle decision.
    AgentDecision(Decision),
}

impl ViolationKind {
    /// Whether this kind was emitted by the engine rather than a collector.
    pub fn is_synthetic(self) -> bool {
        matches!(self, Self::AgentDecision(_))
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::NoFaceDetected => "NO_FACE_DETECTED",
            Self::MultipleFaces => "MULTIPLE_FACES",
            Self::FaceTurnedAway => "FACE_TURNED_AWAY",
            Self::LeftFrame => "LEFT_FRAME",
            Self::GazeOffScreen => "GAZE_OFF_SCREEN",
            Self::SpeechDetected => "SPEECH_DETECTED",
            Self::MultipleVoices => "MULTIPLE_VOICES",
            Self::BackgroundNoise => "BACKGROUND_NOISE",
            Self::LipAudioMismatch => "LIP_AUDIO_MISMATCH",
            Self::TabSwitch => "TAB_SWITCH",
            Self::CopyPasteAttempt => "COPY_PASTE_ATTEMPT",
            Self::ObjectDetected => "OBJECT_DETECTED",
            Self::SuspiciousMovement => "SUSPICIOUS_MOVEMENT",
            Self::AgentDecision(d) => return write!(f, "AGENT_DECISION:{}", d.token()),
        };
        f.write_str(tag)
    }
}

impl std::str::FromStr for ViolationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(token) = s.strip_prefix("AGENT_DECISION:") {
            let decision = token
                .parse::<Decision>()
                .map_err(|_| ValidationError::UnknownKind { kind: s.to_string() })?;
            return Ok(Self::AgentDecision(decision));
        }
        match s {
            "NO_FACE_DETECTED" => Ok(Self::NoFaceDetected),
            "MULTIPLE_FACES" => Ok(Self::MultipleFaces),
            "FACE_TURNED_AWAY" => Ok(Self::FaceTurnedAway),
            "LEFT_FRAME" => Ok(Self::LeftFrame),
            "GAZE_OFF_SCREEN" => Ok(Self::GazeOffScreen),
            "SPEECH_DETECTED" => Ok(Self::SpeechDetected),
            "MULTIPLE_VOICES" => Ok(Self::MultipleVoices),
            "BACKGROUND_NOISE" => Ok(Self::BackgroundNoise),
            "LIP_AUDIO_MISMATCH" => Ok(Self::LipAudioMismatch),
            "TAB_SWITCH" => Ok(Self::TabSwitch),
            "COPY_PASTE_ATTEMPT" => Ok(Self::CopyPasteAttempt),
            "OBJECT_DETECTED" => Ok(Self::ObjectDetected),
            "SUSPICIOUS_MOVEMENT" => Ok(Self::SuspiciousMovement),
            _ => Err(ValidationError::UnknownKind { kind: s.to_string() }),
        }
    }
}

impl Serialize for ViolationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ViolationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A single timestamped anomaly observed by a signal collector, or a
/// synthetic decision record emitted by the engine.
///
/// Events are immutable once created; severity never changes after
/// emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    /// Unique identifier for this event.
    pub id: Uuid,
    /// When the anomaly was observed.
    pub timestamp: DateTime<Utc>,
    /// Classification tag.
    pub kind: ViolationKind,
    /// Severity tier.
    pub severity: Severity,
    /// Collector confidence in [0, 1].
    pub confidence: f64,
    /// Optional free-text explanation.
    pub detail: Option<String>,
}

impl ViolationEvent {
    /// Create an event with the default confidence.
    pub fn new(kind: ViolationKind, severity: Severity, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            kind,
            severity,
            confidence: DEFAULT_CONFIDENCE,
            detail: None,
        }
    }

    /// Override the confidence (builder pattern).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Attach a free-text detail (builder pattern).
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Synthetic event recording an oracle decision, at full confidence.
    pub fn decision_event(
        decision: Decision,
        detail: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let severity = if decision.ends_session() {
            Severity::Critical
        } else {
            Severity::Major
        };
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            kind: ViolationKind::AgentDecision(decision),
            severity,
            confidence: 1.0,
            detail,
        }
    }

    /// Boundary validation applied before an event enters the log.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ConfidenceOutOfRange` when confidence is
    /// not a finite number in [0, 1].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange {
                value: self.confidence,
            });
        }
        Ok(())
    }
}
