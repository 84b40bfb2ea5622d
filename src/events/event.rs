//! # Events emitted by worker handles and the supervisor loop.
//!
//! [`EventKind`] classifies events across three categories:
//! - **Worker lifecycle**: start, exit, stop, escalation;
//! - **Restart flow**: admitted restarts and exhausted budgets;
//! - **Supervisor control**: shutdown, reload, spec merges, sweep errors.
//!
//! [`Event`] carries the kind plus optional metadata (worker name, pid,
//! reason, attempt). Each event gets a globally unique, monotonically
//! increasing sequence number, so subscribers can restore order even when
//! delivery interleaves.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A worker is about to be spawned. Sets `worker`.
    WorkerStarting,
    /// A worker process is up. Sets `worker`, `pid`.
    WorkerStarted,
    /// The OS refused to spawn the worker. Sets `worker`, `reason`.
    WorkerSpawnFailed,
    /// A worker died unexpectedly (crash detected by the sweep).
    /// Sets `worker`, and `pid` when the last known pid is available.
    WorkerExited,
    /// A graceful stop began. Sets `worker`, `pid`.
    WorkerStopping,
    /// A worker reached `Stopped`. Sets `worker`.
    WorkerStopped,
    /// The graceful-stop timeout elapsed and the process group was
    /// force-killed. A logged fallback, not a failure. Sets `worker`.
    StopEscalated,

    // === Restart flow ===
    /// A crash-restart was admitted by the budget. Sets `worker`, `attempt`
    /// (the restart count inside the current window).
    RestartScheduled,
    /// The restart budget is exhausted; the worker moved to `Failed`.
    /// Sets `worker`, `attempt`.
    BudgetExhausted,

    // === Supervisor control ===
    /// A termination signal was observed; shutdown begins.
    ShutdownRequested,
    /// A reload signal was observed; new specs will be merged.
    ReloadRequested,
    /// Reload merged a previously unknown spec. Sets `worker`.
    SpecAdded,
    /// Reload replaced the stored spec of a worker at rest. Sets `worker`.
    SpecUpdated,
    /// A per-worker error was caught during the sweep and did not abort it.
    /// Sets `worker`, `reason`.
    SweepError,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker name, when the event concerns one worker.
    pub worker: Option<Arc<str>>,
    /// OS process id, when known.
    pub pid: Option<u32>,
    /// Human-readable reason (errors, escalation details).
    pub reason: Option<Arc<str>>,
    /// Restart count inside the current window, for restart-flow events.
    pub attempt: Option<u32>,
}

impl Event {
    /// Creates an event of the given kind with the current timestamp and the
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            pid: None,
            reason: None,
            attempt: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a restart count.
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::now(EventKind::WorkerStarting);
        let b = Event::now(EventKind::WorkerStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builder_sets_metadata() {
        let ev = Event::now(EventKind::WorkerExited)
            .with_worker("scout")
            .with_pid(42)
            .with_reason("crash")
            .with_attempt(3);
        assert_eq!(ev.worker.as_deref(), Some("scout"));
        assert_eq!(ev.pid, Some(42));
        assert_eq!(ev.reason.as_deref(), Some("crash"));
        assert_eq!(ev.attempt, Some(3));
    }
}
