//! Rolling violation history and exact windowed counts.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Severity, ViolationEvent};

/// Append-only history of violation events for one session.
///
/// Counts are exact and recomputed on every query by scanning the log —
/// no caching, no approximation. Queries use a timestamp predicate rather
/// than positional cutoffs, so small out-of-order arrival from concurrent
/// collectors is tolerated. Events are only removed by [`clear`] at
/// session start or, when a retention cap is configured, by dropping the
/// oldest entries on append.
///
/// [`clear`]: ViolationLog::clear
#[derive(Debug, Clone, Default)]
pub struct ViolationLog {
    events: Vec<ViolationEvent>,
    retention_cap: Option<usize>,
}

impl ViolationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that keeps at most `cap` events, dropping the oldest.
    pub fn with_retention_cap(cap: usize) -> Self {
        Self {
            events: Vec::new(),
            retention_cap: Some(cap),
        }
    }

    /// Append an event. Never fails; validation happens at the intake
    /// boundary before this point.
    pub fn append(&mut self, event: ViolationEvent) {
        self.events.push(event);
        if let Some(cap) = self.retention_cap {
            if self.events.len() > cap {
                let excess = self.events.len() - cap;
                self.events.drain(..excess);
            }
        }
    }

    /// Exact count of events with the given severity and
    /// `timestamp >= now - window`.
    pub fn count_recent(&self, severity: Severity, window: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - window;
        self.events
            .iter()
            .filter(|e| e.severity == severity && e.timestamp >= cutoff)
            .count()
    }

    /// The ordered slice of events inside the window — the bounded payload
    /// sent to the oracle.
    pub fn recent(&self, window: Duration, now: DateTime<Utc>) -> Vec<ViolationEvent> {
        let cutoff = now - window;
        self.events
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// All events in insertion order.
    pub fn all(&self) -> &[ViolationEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop the full history. Called on session start.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ViolationKind;

    fn event_at(offset_secs: i64, severity: Severity, now: DateTime<Utc>) -> ViolationEvent {
        ViolationEvent::new(
            ViolationKind::GazeOffScreen,
            severity,
            now + Duration::seconds(offset_secs),
        )
    }

    #[test]
    fn test_count_recent_exact() {
        let now = Utc::now();
        let mut log = ViolationLog::new();
        log.append(event_at(-400, Severity::Major, now)); // outside 5-minute window
        log.append(event_at(-200, Severity::Major, now));
        log.append(event_at(-10, Severity::Major, now));
        log.append(event_at(-5, Severity::Warning, now));

        let window = Duration::seconds(300);
        assert_eq!(log.count_recent(Severity::Major, window, now), 2);
        assert_eq!(log.count_recent(Severity::Warning, window, now), 1);
        assert_eq!(log.count_recent(Severity::Critical, window, now), 0);
    }

    #[test]
    fn test_event_outside_window_never_changes_count() {
        let now = Utc::now();
        let window = Duration::seconds(300);
        let mut log = ViolationLog::new();
        log.append(event_at(-10, Severity::Critical, now));
        let before = log.count_recent(Severity::Critical, window, now);

        log.append(event_at(-3600, Severity::Critical, now));
        assert_eq!(log.count_recent(Severity::Critical, window, now), before);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let now = Utc::now();
        let window = Duration::seconds(300);
        let mut log = ViolationLog::new();
        log.append(event_at(-300, Severity::Warning, now)); // exactly now - W
        assert_eq!(log.count_recent(Severity::Warning, window, now), 1);
    }

    #[test]
    fn test_out_of_order_arrival_counted() {
        let now = Utc::now();
        let window = Duration::seconds(300);
        let mut log = ViolationLog::new();
        // A late event arrives after a newer one.
        log.append(event_at(-5, Severity::Warning, now));
        log.append(event_at(-60, Severity::Warning, now));
        assert_eq!(log.count_recent(Severity::Warning, window, now), 2);
    }

    #[test]
    fn test_recent_slice_preserves_order() {
        let now = Utc::now();
        let mut log = ViolationLog::new();
        log.append(event_at(-900, Severity::Major, now));
        log.append(event_at(-120, Severity::Warning, now));
        log.append(event_at(-30, Severity::Critical, now));

        let slice = log.recent(Duration::seconds(300), now);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].severity, Severity::Warning);
        assert_eq!(slice[1].severity, Severity::Critical);
    }

    #[test]
    fn test_retention_cap_drops_oldest() {
        let now = Utc::now();
        let mut log = ViolationLog::with_retention_cap(2);
        log.append(event_at(-30, Severity::Warning, now));
        log.append(event_at(-20, Severity::Major, now));
        log.append(event_at(-10, Severity::Critical, now));

        assert_eq!(log.len(), 2);
        assert_eq!(log.all()[0].severity, Severity::Major);
        assert_eq!(log.all()[1].severity, Severity::Critical);
    }

    #[test]
    fn test_clear() {
        let now = Utc::now();
        let mut log = ViolationLog::new();
        log.append(event_at(-1, Severity::Warning, now));
        log.clear();
        assert!(log.is_empty());
    }
}
