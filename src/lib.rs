//! # agentvisor
//!
//! **Agentvisor** is a lightweight process supervisor for agent fleets: it
//! launches, monitors, restarts, and gracefully terminates a set of
//! independent external worker processes described by a declarative JSON
//! configuration.
//!
//! The supervisor treats workers as opaque programs. It does not interpret
//! what a worker does, provides no IPC between workers beyond environment
//! variables, imposes no start-ordering graph, and persists no history
//! beyond the current run.
//!
//! ## Architecture
//! ```text
//!   agents.json ──► loader ──► Vec<WorkerSpec>
//!                                   │
//!                                   ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Supervisor (one control-loop task)                      │
//! │  - Registry: name → WorkerHandle, registration order     │
//! │  - sweep timer: liveness probe + crash-restart           │
//! │  - control channel: SIGTERM→shutdown, SIGHUP→reload      │
//! │  - Bus: broadcast events ──► subscribers (LogWriter, …)  │
//! └──────┬──────────────────┬─────────────────┬──────────────┘
//!        ▼                  ▼                 ▼
//!   [OS process]       [OS process]      [OS process]
//!   own group,         own group,        own group,
//!   <name>.log/.pid    <name>.log/.pid   <name>.log/.pid
//! ```
//!
//! Each worker runs in its own process group, so a forceful stop also reaps
//! children the worker itself forked. Crashed workers are relaunched through
//! a sliding-window [`RestartBudget`]; a worker that exhausts its budget
//! moves to `Failed` and is left alone until an operator intervenes.
//!
//! ## Worker contract
//! Every worker receives `AGENT_NAME` and `AGENT_PROTOCOL_VERSION` in its
//! environment, and is expected to exit on SIGTERM within the configured
//! grace period or be force-killed.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use agentvisor::{
//!     CommandLine, LogWriter, Subscribe, Supervisor, SupervisorConfig, WorkerSpec,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig::default();
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!
//!     let spec = WorkerSpec::new("scout", CommandLine::Shell("python3 scout.py".into()));
//!
//!     let sup = Supervisor::new(cfg, subs);
//!     sup.run(vec![spec]).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use config::{
    loader, AgentsFile, CommandLine, SupervisorConfig, WorkerSpec, ENV_PROTOCOL_VERSION,
    ENV_WORKER_NAME, PROTOCOL_VERSION,
};
pub use self::core::{signals, status, Supervisor, SupervisorState};
pub use error::{ConfigError, RegistryError, RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{RestartBudget, RestartTracker};
pub use subscribers::{LogWriter, Subscribe};
pub use workers::{os, AddOutcome, Registry, StopOutcome, WorkerHandle, WorkerSnapshot, WorkerState};
