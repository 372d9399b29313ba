//! Derived integrity score.

use crate::domain::ViolationEvent;

/// Compute the session integrity score from the full violation log.
///
/// `score = max(0, 100 - Σ deduction(severity) × confidence)`, clamped to
/// [0, 100]. The score is derived on demand and never stored; an empty
/// log yields 100.
pub fn integrity_score(events: &[ViolationEvent]) -> f64 {
    let total_deductions: f64 = events
        .iter()
        .map(|e| e.severity.deduction() * e.confidence)
        .sum();
    (100.0 - total_deductions).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Severity, ViolationKind};
    use chrono::Utc;

    fn event(severity: Severity, confidence: f64) -> ViolationEvent {
        ViolationEvent::new(ViolationKind::NoFaceDetected, severity, Utc::now())
            .with_confidence(confidence)
    }

    #[test]
    fn test_empty_log_scores_100() {
        assert_eq!(integrity_score(&[]), 100.0);
    }

    #[test]
    fn test_deductions_scale_by_confidence() {
        let events = vec![event(Severity::Critical, 1.0), event(Severity::Major, 0.5)];
        // 100 - (15*1.0 + 8*0.5) = 81
        assert_eq!(integrity_score(&events), 81.0);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let events: Vec<_> = (0..10).map(|_| event(Severity::Critical, 1.0)).collect();
        assert_eq!(integrity_score(&events), 0.0);
    }

    #[test]
    fn test_appending_never_increases_score() {
        let mut events = Vec::new();
        let mut last = integrity_score(&events);
        for severity in [Severity::Warning, Severity::Major, Severity::Critical] {
            events.push(event(severity, 0.9));
            let current = integrity_score(&events);
            assert!(current <= last);
            last = current;
        }
    }

    #[test]
    fn test_zero_confidence_deducts_nothing() {
        let events = vec![event(Severity::Critical, 0.0)];
        assert_eq!(integrity_score(&events), 100.0);
    }
}
