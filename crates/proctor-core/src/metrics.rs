//! Global atomic counters for engine observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at session end).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    events_recorded: AtomicU64,
    events_rejected: AtomicU64,
    oracle_calls: AtomicU64,
    oracle_failures: AtomicU64,
    escalations_suppressed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_recorded: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            oracle_calls: AtomicU64::new(0),
            oracle_failures: AtomicU64::new(0),
            escalations_suppressed: AtomicU64::new(0),
        }
    }

    /// Increment the events-recorded counter by one.
    pub fn inc_events_recorded(&self) {
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the events-rejected counter by one.
    pub fn inc_events_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the oracle-calls counter by one.
    pub fn inc_oracle_calls(&self) {
        self.oracle_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the oracle-failures counter by one.
    pub fn inc_oracle_failures(&self) {
        self.oracle_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the suppressed-escalations counter by one.
    pub fn inc_escalations_suppressed(&self) {
        self.escalations_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (session end, CLI exit) rather
    /// than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_recorded = self.events_recorded(),
            events_rejected = self.events_rejected(),
            oracle_calls = self.oracle_calls(),
            oracle_failures = self.oracle_failures(),
            escalations_suppressed = self.escalations_suppressed(),
        );
    }

    pub fn events_recorded(&self) -> u64 {
        self.events_recorded.load(Ordering::Relaxed)
    }

    pub fn events_rejected(&self) -> u64 {
        self.events_rejected.load(Ordering::Relaxed)
    }

    pub fn oracle_calls(&self) -> u64 {
        self.oracle_calls.load(Ordering::Relaxed)
    }

    pub fn oracle_failures(&self) -> u64 {
        self.oracle_failures.load(Ordering::Relaxed)
    }

    pub fn escalations_suppressed(&self) -> u64 {
        self.escalations_suppressed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.events_recorded.store(0, Ordering::Relaxed);
        self.events_rejected.store(0, Ordering::Relaxed);
        self.oracle_calls.store(0, Ordering::Relaxed);
        self.oracle_failures.store(0, Ordering::Relaxed);
        self.escalations_suppressed.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.events_recorded(), 0);
        m.inc_events_recorded();
        m.inc_events_recorded();
        assert_eq!(m.events_recorded(), 2);

        m.inc_oracle_calls();
        m.inc_oracle_failures();
        assert_eq!(m.oracle_calls(), 1);
        assert_eq!(m.oracle_failures(), 1);

        m.inc_escalations_suppressed();
        assert_eq!(m.escalations_suppressed(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_events_recorded();
        m.inc_events_rejected();
        m.inc_oracle_calls();
        m.reset();
        assert_eq!(m.events_recorded(), 0);
        assert_eq!(m.events_rejected(), 0);
        assert_eq!(m.oracle_calls(), 0);
    }
}
