//! Cooldown gate serializing oracle consultations.

use chrono::{DateTime, Duration, Utc};

/// Rate limiter holding the time of the last oracle call.
///
/// The gate is claimed optimistically at call-initiation time, not at
/// call-completion time: a burst of qualifying triggers arriving while
/// one call is in flight claims the gate once and suppresses the rest.
/// The gate is an explicit field owned by the engine, not a module-level
/// singleton.
#[derive(Debug, Clone)]
pub struct CallGate {
    cooldown_secs: u64,
    last_call: Option<DateTime<Utc>>,
}

impl CallGate {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown_secs,
            last_call: None,
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs as i64)
    }

    /// Whether a call would currently be permitted, without claiming.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        match self.last_call {
            None => true,
            Some(last) => now - last >= self.cooldown(),
        }
    }

    /// Claim the gate for a call starting now.
    ///
    /// Returns `true` and records `now` as the last call time when the
    /// cooldown has elapsed; returns `false` (and records nothing) when
    /// the gate is still cooling down.
    pub fn try_claim(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_open(now) {
            self.last_call = Some(now);
            true
        } else {
            false
        }
    }

    /// Forget the last call time. Called on session start so a fresh
    /// session is never throttled by the previous one.
    pub fn reset(&mut self) {
        self.last_call = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_claim_always_permitted() {
        let mut gate = CallGate::new(30);
        assert!(gate.try_claim(Utc::now()));
    }

    #[test]
    fn test_claim_within_cooldown_rejected() {
        let now = Utc::now();
        let mut gate = CallGate::new(30);
        assert!(gate.try_claim(now));
        assert!(!gate.try_claim(now + Duration::seconds(5)));
        assert!(!gate.try_claim(now + Duration::seconds(29)));
    }

    #[test]
    fn test_claim_after_cooldown_permitted() {
        let now = Utc::now();
        let mut gate = CallGate::new(30);
        assert!(gate.try_claim(now));
        assert!(gate.try_claim(now + Duration::seconds(30)));
    }

    #[test]
    fn test_rejected_claim_does_not_extend_cooldown() {
        let now = Utc::now();
        let mut gate = CallGate::new(30);
        assert!(gate.try_claim(now));
        // A rejected attempt at t+20 must not push the window out.
        assert!(!gate.try_claim(now + Duration::seconds(20)));
        assert!(gate.try_claim(now + Duration::seconds(30)));
    }

    #[test]
    fn test_reset_reopens_gate() {
        let now = Utc::now();
        let mut gate = CallGate::new(30);
        assert!(gate.try_claim(now));
        gate.reset();
        assert!(gate.try_claim(now + Duration::seconds(1)));
    }
}
