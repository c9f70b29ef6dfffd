//! Shutdown timer state
//!
//! Written on every access event. Nothing reads it back to gate the
//! shutdown decision: an access triggers the shutdown immediately.

use chrono::{DateTime, Utc};

/// Whether an access was seen and when the latest one happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownTimerState {
    access_observed: bool,
    last_access: Option<DateTime<Utc>>,
}

impl ShutdownTimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access observed at `at`
    ///
    /// The stored timestamp never moves backwards, even if the wall clock
    /// does between two calls.
    pub fn record_access(&mut self, at: DateTime<Utc>) {
        self.access_observed = true;
        self.last_access = Some(match self.last_access {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }

    pub fn access_observed(&self) -> bool {
        self.access_observed
    }

    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        self.last_access
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_starts_clear() {
        let state = ShutdownTimerState::new();
        assert!(!state.access_observed());
        assert_eq!(state.last_access(), None);
    }

    #[test]
    fn test_record_access_sets_flag_and_time() {
        let mut state = ShutdownTimerState::new();
        let now = Utc::now();

        state.record_access(now);

        assert!(state.access_observed());
        assert_eq!(state.last_access(), Some(now));
    }

    #[test]
    fn test_timestamp_is_monotonic() {
        let mut state = ShutdownTimerState::new();
        let now = Utc::now();

        state.record_access(now);
        state.record_access(now - Duration::seconds(30));
        assert_eq!(state.last_access(), Some(now));

        let later = now + Duration::seconds(5);
        state.record_access(later);
        assert_eq!(state.last_access(), Some(later));
    }
}
