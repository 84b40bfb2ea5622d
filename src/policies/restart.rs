//! # Sliding-window restart budget.
//!
//! [`RestartBudget`] is a pure decision function over the timing state held
//! in a [`RestartTracker`]: it has no side effects beyond the counters it is
//! given to update.
//!
//! ## Algorithm
//! On each restart attempt at time `t`:
//! 1. If `t - last_restart_at > window`, reset `count = 0` — the window has
//!    elapsed, so past crashes don't count against a worker that has been
//!    stable since.
//! 2. Increment `count`.
//! 3. If `count > max_restarts`, reject. The worker moves to `Failed` and is
//!    not auto-restarted until an operator clears the tracker.
//! 4. Otherwise accept and set `last_restart_at = t`.
//!
//! Rejections do not stamp `last_restart_at`, so the window keeps aging from
//! the last *accepted* restart: a worker rejected inside the window becomes
//! eligible again once the window elapses.

use std::time::{Duration, Instant};

/// Ceiling on restarts inside one sliding window.
#[derive(Clone, Copy, Debug)]
pub struct RestartBudget {
    /// Maximum accepted restarts per window.
    pub max_restarts: u32,
    /// Width of the sliding window.
    pub window: Duration,
}

impl RestartBudget {
    /// Decides one restart attempt at time `now`, updating `tracker`.
    ///
    /// Returns `true` when the restart is admitted.
    pub fn admit(&self, tracker: &mut RestartTracker, now: Instant) -> bool {
        if let Some(last) = tracker.last_restart_at {
            if now.duration_since(last) > self.window {
                tracker.count = 0;
            }
        }
        tracker.count += 1;
        if tracker.count > self.max_restarts {
            return false;
        }
        tracker.last_restart_at = Some(now);
        true
    }
}

/// Mutable timing state for one worker's restart budget.
///
/// Owned by the worker handle; reset by explicit operator intervention.
#[derive(Clone, Copy, Debug, Default)]
pub struct RestartTracker {
    /// Accepted-or-attempted restarts inside the current window.
    pub count: u32,
    /// Time of the last accepted restart.
    pub last_restart_at: Option<Instant>,
}

impl RestartTracker {
    /// Clears the counters, e.g. after a manual restart.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max_restarts: u32, window_secs: u64) -> RestartBudget {
        RestartBudget {
            max_restarts,
            window: Duration::from_secs(window_secs),
        }
    }

    #[test]
    fn test_fresh_tracker_admits() {
        let b = budget(1, 60);
        let mut t = RestartTracker::default();
        assert!(b.admit(&mut t, Instant::now()));
        assert_eq!(t.count, 1);
    }

    #[test]
    fn test_exactly_max_restarts_admitted_within_window() {
        // maxRestarts=2, restartWindow=60, crashes at t=0, 10, 20, 30:
        // restarts admitted for the first two crashes, the third is
        // rejected, and the worker would move to Failed.
        let b = budget(2, 60);
        let mut t = RestartTracker::default();
        let t0 = Instant::now();

        assert!(b.admit(&mut t, t0));
        assert!(b.admit(&mut t, t0 + Duration::from_secs(10)));
        assert!(!b.admit(&mut t, t0 + Duration::from_secs(20)));
        assert!(!b.admit(&mut t, t0 + Duration::from_secs(30)));
    }

    #[test]
    fn test_window_elapse_resets_counter() {
        let b = budget(2, 60);
        let mut t = RestartTracker::default();
        let t0 = Instant::now();

        assert!(b.admit(&mut t, t0));
        assert!(b.admit(&mut t, t0 + Duration::from_secs(5)));
        assert!(!b.admit(&mut t, t0 + Duration::from_secs(10)));

        // More than one window after the last accepted restart (t0+5):
        // treated as a fresh window with the full budget again.
        let late = t0 + Duration::from_secs(70);
        assert!(b.admit(&mut t, late));
        assert_eq!(t.count, 1);
        assert!(b.admit(&mut t, late + Duration::from_secs(1)));
        assert!(!b.admit(&mut t, late + Duration::from_secs(2)));
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let b = budget(1, 60);
        let mut t = RestartTracker::default();
        let t0 = Instant::now();

        assert!(b.admit(&mut t, t0));
        // Rejected attempts inside the window must not stamp the tracker,
        // otherwise a crash-looping worker would never age out.
        assert!(!b.admit(&mut t, t0 + Duration::from_secs(30)));
        assert!(!b.admit(&mut t, t0 + Duration::from_secs(59)));
        assert!(b.admit(&mut t, t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_boundary_is_strictly_greater_than_window() {
        let b = budget(1, 60);
        let mut t = RestartTracker::default();
        let t0 = Instant::now();

        assert!(b.admit(&mut t, t0));
        // Exactly at the window edge the old count still applies.
        assert!(!b.admit(&mut t, t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_reset_clears_budget() {
        let b = budget(1, 60);
        let mut t = RestartTracker::default();
        let t0 = Instant::now();

        assert!(b.admit(&mut t, t0));
        assert!(!b.admit(&mut t, t0 + Duration::from_secs(1)));
        t.reset();
        assert!(b.admit(&mut t, t0 + Duration::from_secs(2)));
    }

    #[test]
    fn test_zero_budget_rejects_everything() {
        let b = budget(0, 60);
        let mut t = RestartTracker::default();
        assert!(!b.admit(&mut t, Instant::now()));
    }
}
