//! # Worker handle: one external process's lifecycle.
//!
//! [`WorkerHandle`] is the supervisor's live, mutable record of one worker.
//! It owns the spawned [`Child`], the restart tracker, the append-only log
//! sink, and the pid marker file.
//!
//! ## State machine
//! ```text
//! Stopped ──start()──► Starting ──► Running ──stop()──► Stopping ──► Stopped
//!                                      │
//!                                      └─ unexpected exit, budget exhausted ──► Failed
//! ```
//!
//! ## Rules
//! - `start()` never consumes restart budget; the budget is consulted on the
//!   crash path (`restart()`), so the initial launch of a worker that then
//!   crashes `N` times yields exactly `min(N, max_restarts)` relaunches.
//! - `stop()` cannot fail. Problems on the stop path are logged, the handle
//!   always ends `Stopped`, because shutdown must be total.
//! - The pid marker file is advisory; `is_alive()` is the source of truth.

use std::process::Stdio;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::{SupervisorConfig, WorkerSpec, ENV_PROTOCOL_VERSION, ENV_WORKER_NAME, PROTOCOL_VERSION};
use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RestartBudget, RestartTracker};
use crate::workers::os;

/// Lifecycle state of one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Not running; either never started or cleanly stopped.
    Stopped,
    /// Spawn in progress.
    Starting,
    /// Process is up.
    Running,
    /// Graceful stop in progress.
    Stopping,
    /// Gave up restarting: the budget was exhausted. Distinct from
    /// `Stopped` so an operator can tell "intentionally off" from
    /// "crash-looped until the supervisor stopped trying".
    Failed,
}

impl WorkerState {
    /// True while the handle owns (or is acquiring/releasing) a process.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            WorkerState::Starting | WorkerState::Running | WorkerState::Stopping
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Stopped => "stopped",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a `stop()` call concluded. Never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// The handle was already `Stopped`; no OS state was touched.
    AlreadyStopped,
    /// The process group exited within the graceful timeout.
    Graceful,
    /// The graceful timeout elapsed; the process group was force-killed.
    Forced,
}

/// Point-in-time view of one worker, serializable for the status report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// Worker name.
    pub name: String,
    /// Lifecycle state.
    pub state: WorkerState,
    /// OS process id, present only while live.
    pub pid: Option<u32>,
    /// Unix timestamp (seconds) of the last successful start.
    pub started_at: Option<u64>,
    /// Restarts counted inside the current window.
    pub restart_count: u32,
    /// Seconds since the last successful start; absent unless `Running`.
    pub uptime_secs: Option<u64>,
}

/// Live, mutable record of one worker. Owned exclusively by the
/// [`Registry`](crate::workers::Registry).
#[derive(Debug)]
pub struct WorkerHandle {
    spec: WorkerSpec,
    state: WorkerState,
    child: Option<Child>,
    pid: Option<u32>,
    started_at: Option<SystemTime>,
    started_mono: Option<Instant>,
    tracker: RestartTracker,
    pid_file: std::path::PathBuf,
    log_file: std::path::PathBuf,
    grace: Duration,
    restart_pause: Duration,
    bus: Bus,
}

impl WorkerHandle {
    /// Creates a handle in `Stopped` with no process attached.
    pub fn new(spec: WorkerSpec, cfg: &SupervisorConfig, bus: Bus) -> Self {
        let pid_file = cfg.worker_pid_file(&spec.name);
        let log_file = cfg.worker_log_file(&spec.name);
        Self {
            spec,
            state: WorkerState::Stopped,
            child: None,
            pid: None,
            started_at: None,
            started_mono: None,
            tracker: RestartTracker::default(),
            pid_file,
            log_file,
            grace: cfg.grace,
            restart_pause: cfg.restart_pause,
            bus,
        }
    }

    /// The worker's declared configuration.
    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Convenience: the worker name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Last known OS process id, present only while live.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn budget(&self) -> RestartBudget {
        RestartBudget {
            max_restarts: self.spec.max_restarts,
            window: self.spec.restart_window(),
        }
    }

    /// Launches the worker process.
    ///
    /// Opens the log sink in append mode, merges the environment (inherited
    /// + spec `env_vars` + the `AGENT_NAME`/`AGENT_PROTOCOL_VERSION`
    /// contract), spawns detached into its own process group, writes the pid
    /// marker file, and transitions to `Running`.
    ///
    /// Fails with [`WorkerError::AlreadyRunning`] while `Starting`/`Running`
    /// and with [`WorkerError::Spawn`] when the OS refuses; on spawn failure
    /// the handle returns to `Stopped`.
    pub async fn start(&mut self) -> Result<(), WorkerError> {
        if matches!(self.state, WorkerState::Starting | WorkerState::Running) {
            return Err(WorkerError::AlreadyRunning {
                name: self.spec.name.clone(),
            });
        }

        self.state = WorkerState::Starting;
        self.bus
            .publish(Event::now(EventKind::WorkerStarting).with_worker(self.spec.name.as_str()));

        match self.spawn_process() {
            Ok(child) => {
                let pid = child.id();
                self.child = Some(child);
                self.pid = pid;
                self.started_at = Some(SystemTime::now());
                self.started_mono = Some(Instant::now());
                self.write_pid_marker();
                self.state = WorkerState::Running;

                let mut ev =
                    Event::now(EventKind::WorkerStarted).with_worker(self.spec.name.as_str());
                if let Some(pid) = pid {
                    ev = ev.with_pid(pid);
                }
                self.bus.publish(ev);
                Ok(())
            }
            Err(source) => {
                self.state = WorkerState::Stopped;
                self.bus.publish(
                    Event::now(EventKind::WorkerSpawnFailed)
                        .with_worker(self.spec.name.as_str())
                        .with_reason(source.to_string()),
                );
                Err(WorkerError::Spawn {
                    name: self.spec.name.clone(),
                    source,
                })
            }
        }
    }

    fn spawn_process(&self) -> std::io::Result<Child> {
        let (program, args) = self.spec.command.program_and_args().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command")
        })?;

        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;
        let log_err = log.try_clone()?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.spec.working_dir)
            .envs(&self.spec.env_vars)
            .env(ENV_WORKER_NAME, &self.spec.name)
            .env(ENV_PROTOCOL_VERSION, PROTOCOL_VERSION)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(false);
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn()
    }

    /// Stops the worker, escalating from SIGTERM to SIGKILL.
    ///
    /// No-op on an already-`Stopped` handle. This path cannot fail: stop
    /// problems are logged, never propagated, and the handle always ends
    /// `Stopped` with the pid marker removed.
    pub async fn stop(&mut self, timeout: Duration) -> StopOutcome {
        if self.state == WorkerState::Stopped {
            return StopOutcome::AlreadyStopped;
        }

        let Some(mut child) = self.child.take() else {
            // Failed (or half-initialized) handle with no process attached:
            // normalize the bookkeeping only.
            self.finish_stop();
            return StopOutcome::AlreadyStopped;
        };

        self.state = WorkerState::Stopping;
        let mut ev = Event::now(EventKind::WorkerStopping).with_worker(self.spec.name.as_str());
        if let Some(pid) = self.pid {
            ev = ev.with_pid(pid);
        }
        self.bus.publish(ev);

        self.signal_group_term(&mut child).await;

        let outcome = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(res) => {
                if let Err(err) = res {
                    warn!(worker = %self.spec.name, error = %err, "wait after SIGTERM failed");
                }
                StopOutcome::Graceful
            }
            Err(_elapsed) => {
                self.bus.publish(
                    Event::now(EventKind::StopEscalated).with_worker(self.spec.name.as_str()),
                );
                self.kill_group_hard(&mut child).await;
                if let Err(err) = child.wait().await {
                    warn!(worker = %self.spec.name, error = %err, "wait after SIGKILL failed");
                }
                StopOutcome::Forced
            }
        };

        self.finish_stop();
        outcome
    }

    #[cfg(unix)]
    async fn signal_group_term(&self, _child: &mut Child) {
        if let Some(pid) = self.pid {
            if let Err(err) = os::terminate_group(pid) {
                // ESRCH here just means the process beat us to the exit.
                debug!(worker = %self.spec.name, pid, error = %err, "SIGTERM to group failed");
            }
        }
    }

    #[cfg(not(unix))]
    async fn signal_group_term(&self, child: &mut Child) {
        if let Err(err) = child.start_kill() {
            debug!(worker = %self.spec.name, error = %err, "kill failed");
        }
    }

    #[cfg(unix)]
    async fn kill_group_hard(&self, _child: &mut Child) {
        if let Some(pid) = self.pid {
            if let Err(err) = os::kill_group(pid) {
                debug!(worker = %self.spec.name, pid, error = %err, "SIGKILL to group failed");
            }
        }
    }

    #[cfg(not(unix))]
    async fn kill_group_hard(&self, child: &mut Child) {
        if let Err(err) = child.start_kill() {
            debug!(worker = %self.spec.name, error = %err, "kill failed");
        }
    }

    fn finish_stop(&mut self) {
        self.remove_pid_marker();
        self.child = None;
        self.pid = None;
        self.started_at = None;
        self.started_mono = None;
        self.state = WorkerState::Stopped;
        self.bus
            .publish(Event::now(EventKind::WorkerStopped).with_worker(self.spec.name.as_str()));
    }

    /// Relaunches a crashed worker through the restart budget.
    ///
    /// Rejection moves the handle to `Failed` and returns
    /// [`WorkerError::RestartBudgetExceeded`]; the worker is then left alone
    /// until an operator intervenes. Acceptance stops whatever is left of
    /// the old process, pauses briefly so OS-level resources (listening
    /// sockets) release, and starts again.
    pub async fn restart(&mut self) -> Result<(), WorkerError> {
        let budget = self.budget();
        if !budget.admit(&mut self.tracker, Instant::now()) {
            self.mark_failed().await;
            self.bus.publish(
                Event::now(EventKind::BudgetExhausted)
                    .with_worker(self.spec.name.as_str())
                    .with_attempt(self.tracker.count),
            );
            return Err(WorkerError::RestartBudgetExceeded {
                name: self.spec.name.clone(),
                max_restarts: budget.max_restarts,
            });
        }

        self.bus.publish(
            Event::now(EventKind::RestartScheduled)
                .with_worker(self.spec.name.as_str())
                .with_attempt(self.tracker.count),
        );

        self.stop(self.grace).await;
        tokio::time::sleep(self.restart_pause).await;
        self.start().await
    }

    async fn mark_failed(&mut self) {
        if let Some(mut child) = self.child.take() {
            // The process is already dead (that is why we are here); reap it
            // and sweep up any children it left in the group.
            if let Some(pid) = self.pid {
                let _ = os::kill_group(pid);
            }
            if let Err(err) = child.wait().await {
                warn!(worker = %self.spec.name, error = %err, "reap on failure path failed");
            }
        }
        self.remove_pid_marker();
        self.pid = None;
        self.started_at = None;
        self.started_mono = None;
        self.state = WorkerState::Failed;
    }

    /// Non-blocking liveness probe.
    ///
    /// Probes (and, on exit, reaps) the owned child via `try_wait`. A probe
    /// error is logged and reported as not-alive so the sweep can recover
    /// the worker rather than wedge on it.
    pub fn is_alive(&mut self) -> bool {
        match self.child.as_mut() {
            None => false,
            Some(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(_status)) => false,
                Err(err) => {
                    warn!(worker = %self.spec.name, error = %err, "liveness probe failed");
                    false
                }
            },
        }
    }

    /// Records an unexpected exit for a worker that is not restart-eligible:
    /// drops the reaped child, removes the pid marker, lands in `Stopped`.
    pub fn mark_exited(&mut self) {
        self.child = None;
        self.remove_pid_marker();
        self.pid = None;
        self.started_at = None;
        self.started_mono = None;
        self.state = WorkerState::Stopped;
    }

    /// Operator intervention: clears the restart counters and lifts a
    /// `Failed` handle back to `Stopped` so it may be started again.
    pub fn reset_restart_state(&mut self) {
        self.tracker.reset();
        if self.state == WorkerState::Failed {
            self.state = WorkerState::Stopped;
        }
    }

    /// Replaces the stored spec. Only meaningful for a handle at rest; the
    /// registry guards the live case. Clears the restart counters since the
    /// budget belongs to the old spec.
    pub(crate) fn replace_spec(&mut self, spec: WorkerSpec, cfg: &SupervisorConfig) {
        self.pid_file = cfg.worker_pid_file(&spec.name);
        self.log_file = cfg.worker_log_file(&spec.name);
        self.spec = spec;
        self.reset_restart_state();
    }

    /// Point-in-time view for the status report.
    pub fn snapshot(&self) -> WorkerSnapshot {
        let uptime_secs = match self.state {
            WorkerState::Running => self.started_mono.map(|t| t.elapsed().as_secs()),
            _ => None,
        };
        WorkerSnapshot {
            name: self.spec.name.clone(),
            state: self.state,
            pid: self.pid,
            started_at: self
                .started_at
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
            restart_count: self.tracker.count,
            uptime_secs,
        }
    }

    fn write_pid_marker(&self) {
        let Some(pid) = self.pid else { return };
        if let Err(err) = std::fs::write(&self.pid_file, format!("{pid}\n")) {
            // Advisory file only; the handle keeps its own pid.
            warn!(worker = %self.spec.name, path = %self.pid_file.display(), error = %err,
                "failed to write pid marker");
        }
    }

    fn remove_pid_marker(&self) {
        match std::fs::remove_file(&self.pid_file) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(worker = %self.spec.name, path = %self.pid_file.display(), error = %err,
                    "failed to remove pid marker");
            }
        }
    }
}
