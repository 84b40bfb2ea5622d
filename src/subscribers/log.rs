//! # Built-in logging subscriber.
//!
//! [`LogWriter`] renders runtime events through `tracing`, one line per
//! event. Crash-path events log at `warn`, budget exhaustion at `error`,
//! everything else at `info`.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Renders every runtime event as a structured `tracing` record.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::WorkerStarting => info!(worker, "starting"),
            EventKind::WorkerStarted => info!(worker, pid = e.pid, "started"),
            EventKind::WorkerSpawnFailed => {
                warn!(worker, reason = e.reason.as_deref(), "spawn failed")
            }
            EventKind::WorkerExited => warn!(worker, pid = e.pid, "exited unexpectedly"),
            EventKind::WorkerStopping => info!(worker, pid = e.pid, "stopping"),
            EventKind::WorkerStopped => info!(worker, "stopped"),
            EventKind::StopEscalated => {
                warn!(worker, "graceful stop timed out; process group killed")
            }
            EventKind::RestartScheduled => {
                info!(worker, attempt = e.attempt, "restart admitted")
            }
            EventKind::BudgetExhausted => {
                error!(worker, attempt = e.attempt, "restart budget exhausted; marked failed")
            }
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::ReloadRequested => info!("reload requested"),
            EventKind::SpecAdded => info!(worker, "spec added by reload"),
            EventKind::SpecUpdated => info!(worker, "spec updated by reload"),
            EventKind::SweepError => {
                warn!(worker, reason = e.reason.as_deref(), "sweep error")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
