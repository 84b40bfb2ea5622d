//! # Supervisor: the control loop.
//!
//! The [`Supervisor`] owns the event bus, the worker registry, and the
//! runtime configuration. One task runs the whole state machine; workers are
//! separate OS processes, so the only concurrency inside the supervisor is
//! the `select!` between the sweep timer and the control-event channel.
//!
//! ```text
//! Initializing ──► Running ──► ShuttingDown ──► Terminated
//!      │              │
//!      │              ├─ tick ──► sweep: visit handles in registration
//!      │              │           order; crashed + restart_on_crash
//!      │              │           ──► restart() through the budget
//!      │              ├─ SIGHUP ──► merge new specs (live workers untouched)
//!      │              └─ SIGTERM/SIGINT ──► ShuttingDown
//!      └─ staggered autostart (individual failures logged, never fatal)
//! ```
//!
//! ## Failure semantics
//! - A worker's start/stop/restart error never propagates out of the sweep;
//!   it is published on the bus and logged against that worker.
//! - A config parse failure at startup falls back to built-in defaults
//!   (handled by the caller via the loader); a parse failure during reload
//!   keeps the current registry untouched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{loader, SupervisorConfig, WorkerSpec};
use crate::core::signals::{self, ControlEvent};
use crate::core::status::{self, StatusReport};
use crate::error::{ConfigError, RuntimeError, WorkerError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;
use crate::workers::{AddOutcome, Registry, WorkerState};

/// State of the supervisor loop itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    /// Loading configuration, building the registry, starting workers.
    Initializing,
    /// Sweeping on the timer, serving control events.
    Running,
    /// Stopping every handle in registration order.
    ShuttingDown,
    /// Terminal; the process exits.
    Terminated,
}

/// Coordinates worker handles, event delivery, and graceful shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: Vec<Arc<dyn Subscribe>>,
    registry: Registry,
    state: SupervisorState,
    token: CancellationToken,
}

impl Supervisor {
    /// Creates a supervisor in `Initializing` with an empty registry.
    ///
    /// Specs are supplied to [`run`](Supervisor::run) (or
    /// [`bootstrap`](Supervisor::bootstrap)) so the caller decides the
    /// loading/fallback policy.
    pub fn new(cfg: SupervisorConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        let registry = Registry::empty(&cfg, bus.clone());
        Self {
            cfg,
            bus,
            subs: subscribers,
            registry,
            state: SupervisorState::Initializing,
            token: CancellationToken::new(),
        }
    }

    /// The event bus, for additional ad-hoc receivers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Current loop state.
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// The worker registry (read side).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The worker registry (write side), for embedders driving the state
    /// machine manually.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Runs the supervisor until a termination signal: bootstrap, then the
    /// sweep/control loop, then total shutdown.
    pub async fn run(mut self, specs: Vec<WorkerSpec>) -> Result<(), RuntimeError> {
        let mut ctrl = signals::spawn_listeners(&self.token)
            .map_err(|source| RuntimeError::SignalSetup { source })?;

        self.bootstrap(specs).await?;

        let mut tick = tokio::time::interval(self.cfg.sweep_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => self.sweep_once().await,
                ev = ctrl.recv() => match ev {
                    Some(ControlEvent::Reload) => self.reload().await,
                    Some(ControlEvent::Shutdown) | None => {
                        self.bus.publish(Event::now(EventKind::ShutdownRequested));
                        break;
                    }
                },
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// `Initializing`: prepare directories, write the supervisor pid file,
    /// build the registry, start every `auto_start` worker staggered.
    ///
    /// Individual start failures are published and logged, not fatal; the
    /// supervisor still transitions to `Running` with the failures visible
    /// in status output.
    pub async fn bootstrap(&mut self, specs: Vec<WorkerSpec>) -> Result<(), RuntimeError> {
        self.cfg.ensure_dirs().map_err(|source| ConfigError::Io {
            path: self.cfg.run_dir.clone(),
            source,
        })?;
        let pid_path = self.cfg.supervisor_pid_file();
        std::fs::write(&pid_path, format!("{}\n", std::process::id())).map_err(|source| {
            ConfigError::Io {
                path: pid_path.clone(),
                source,
            }
        })?;

        self.spawn_subscriber_listener();
        self.registry = Registry::build(specs, &self.cfg, self.bus.clone())?;

        let autostart: Vec<String> = self
            .registry
            .iter()
            .filter(|h| h.spec().auto_start)
            .map(|h| h.name().to_string())
            .collect();
        self.start_staggered(&autostart).await;

        self.state = SupervisorState::Running;
        self.write_status();
        info!(workers = self.registry.len(), autostart = autostart.len(), "supervisor running");
        Ok(())
    }

    /// One pass of the health sweep, in registration order.
    ///
    /// A handle whose recorded state is `Running` but whose probe reports
    /// dead has died unexpectedly (a handle we are stopping is `Stopping`
    /// by then, so intentional stops never match). Per-worker errors never
    /// abort the sweep of the remaining workers.
    pub async fn sweep_once(&mut self) {
        for handle in self.registry.iter_mut() {
            if handle.state() != WorkerState::Running {
                continue;
            }
            if handle.is_alive() {
                continue;
            }

            let name = handle.name().to_string();
            let mut ev = Event::now(EventKind::WorkerExited).with_worker(name.as_str());
            if let Some(pid) = handle.pid() {
                ev = ev.with_pid(pid);
            }
            self.bus.publish(ev);

            if !handle.spec().restart_on_crash {
                debug!(worker = %name, "exited; not restart-eligible");
                handle.mark_exited();
                continue;
            }

            match handle.restart().await {
                Ok(()) => {}
                Err(WorkerError::RestartBudgetExceeded { .. }) => {
                    // BudgetExhausted already published by the handle.
                    warn!(worker = %name, "gave up restarting");
                }
                Err(err) => {
                    self.bus.publish(
                        Event::now(EventKind::SweepError)
                            .with_worker(name.as_str())
                            .with_reason(err.to_string()),
                    );
                    warn!(worker = %name, error = %err, label = err.as_label(), "restart failed");
                }
            }
        }
        self.write_status();
    }

    /// Reload: merge newly discovered specs without touching live workers.
    ///
    /// A broken agents file here keeps the current registry; the old
    /// configuration keeps serving until the file is fixed.
    pub async fn reload(&mut self) {
        self.bus.publish(Event::now(EventKind::ReloadRequested));

        let specs = match loader::load_or_bootstrap(&self.cfg.config_path) {
            Ok(specs) => specs,
            Err(err) => {
                warn!(error = %err, label = err.as_label(), "reload failed; keeping current registry");
                return;
            }
        };

        let mut fresh: Vec<String> = Vec::new();
        for spec in specs {
            let name = spec.name.clone();
            let auto_start = spec.auto_start;
            match self.registry.add(spec) {
                AddOutcome::Added => {
                    self.bus
                        .publish(Event::now(EventKind::SpecAdded).with_worker(name.as_str()));
                    if auto_start {
                        fresh.push(name);
                    }
                }
                AddOutcome::Updated => {
                    self.bus
                        .publish(Event::now(EventKind::SpecUpdated).with_worker(name.as_str()));
                }
                AddOutcome::SkippedLive => {}
            }
        }

        self.start_staggered(&fresh).await;
        self.write_status();
    }

    /// `ShuttingDown`: stop every handle in registration order, then clean
    /// up the run directory and reach `Terminated`.
    pub async fn shutdown(&mut self) {
        self.state = SupervisorState::ShuttingDown;
        self.write_status();

        let grace = self.cfg.grace;
        for handle in self.registry.iter_mut() {
            handle.stop(grace).await;
        }

        for path in [self.cfg.status_file(), self.cfg.supervisor_pid_file()] {
            if let Err(err) = std::fs::remove_file(&path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %err, "cleanup failed");
                }
            }
        }

        self.state = SupervisorState::Terminated;
        self.token.cancel();
        info!("supervisor terminated");
    }

    /// Starts the named workers with the configured stagger between them.
    async fn start_staggered(&mut self, names: &[String]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.cfg.stagger).await;
            }
            let Some(handle) = self.registry.get_mut(name) else {
                continue;
            };
            if let Err(err) = handle.start().await {
                warn!(worker = %name, error = %err, label = err.as_label(), "start failed");
            }
        }
    }

    /// Forwards bus events to all subscribers from a single listener task.
    fn spawn_subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let subs = self.subs.clone();
        let token = self.token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => {
                            for sub in &subs {
                                sub.on_event(&ev).await;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber listener lagged");
                        }
                    },
                }
            }
        });
    }

    fn write_status(&self) {
        let report = StatusReport::now(self.state, self.registry.snapshots());
        if let Err(err) = status::write(&self.cfg.status_file(), &report) {
            warn!(error = %err, label = err.as_label(), "status write failed");
        }
    }
}
