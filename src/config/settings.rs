//! # Supervisor runtime settings.
//!
//! [`SupervisorConfig`] controls the supervisor's own behavior: where the
//! agents file, pid files, and logs live, how often the health sweep runs,
//! how long a graceful stop may take, and how starts are staggered.
//!
//! Worker-level settings (restart budget, environment) live on
//! [`WorkerSpec`](crate::config::WorkerSpec), not here.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings for the supervisor process.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Path of the agents file.
    pub config_path: PathBuf,
    /// Directory for pid marker files and the status report.
    pub run_dir: PathBuf,
    /// Directory for per-worker log files.
    pub log_dir: PathBuf,
    /// Graceful-stop timeout before escalating to a forceful kill.
    pub grace: Duration,
    /// Interval between health sweeps.
    pub sweep_interval: Duration,
    /// Delay between consecutive autostarts (avoids a thundering herd).
    pub stagger: Duration,
    /// Pause between stop and start inside `restart()`, letting OS-level
    /// resources such as listening sockets release.
    pub restart_pause: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for SupervisorConfig {
    /// Provides a default configuration:
    /// - `config_path = "agents.json"`
    /// - `run_dir = "run"`, `log_dir = "logs"`
    /// - `grace = 10s`, `sweep_interval = 1s`
    /// - `stagger = 250ms`, `restart_pause = 500ms`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("agents.json"),
            run_dir: PathBuf::from("run"),
            log_dir: PathBuf::from("logs"),
            grace: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(1),
            stagger: Duration::from_millis(250),
            restart_pause: Duration::from_millis(500),
            bus_capacity: 1024,
        }
    }
}

impl SupervisorConfig {
    /// Pid file of the supervisor process itself.
    pub fn supervisor_pid_file(&self) -> PathBuf {
        self.run_dir.join("agentvisor.pid")
    }

    /// Status report rewritten after every sweep.
    pub fn status_file(&self) -> PathBuf {
        self.run_dir.join("status.json")
    }

    /// Pid marker file for one worker.
    pub fn worker_pid_file(&self, name: &str) -> PathBuf {
        self.run_dir.join(format!("{name}.pid"))
    }

    /// Append-only log sink for one worker (combined stdout + stderr).
    pub fn worker_log_file(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{name}.log"))
    }

    /// Log sink for a detached supervisor's own output.
    pub fn supervisor_log_file(&self) -> PathBuf {
        self.log_dir.join("agentvisor.log")
    }

    /// Creates `run_dir` and `log_dir` if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.run_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    /// Rebases all relative paths onto `base`. Used by tests and embedders
    /// that confine the supervisor to a scratch directory.
    pub fn rooted_at(base: &Path) -> Self {
        let mut cfg = Self::default();
        cfg.config_path = base.join("agents.json");
        cfg.run_dir = base.join("run");
        cfg.log_dir = base.join("logs");
        cfg
    }
}
