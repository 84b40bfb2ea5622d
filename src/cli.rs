//! # Command-line surface.
//!
//! `start` runs the supervisor (optionally detached), `stop` signals a
//! running supervisor via its pid file, `restart` chains the two, `status`
//! renders the status report the supervisor rewrites after every sweep.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use agentvisor::{loader, os, status, LogWriter, Subscribe, Supervisor, SupervisorConfig, WorkerState};

/// Process supervisor for agent fleets.
#[derive(Parser, Debug)]
#[command(name = "agentvisor", version, about)]
pub struct Cli {
    /// Path of the agents file.
    #[arg(long, global = true, default_value = "agents.json", env = "AGENTVISOR_CONFIG")]
    pub config: PathBuf,

    /// Directory for pid files and the status report.
    #[arg(long, global = true, default_value = "run", env = "AGENTVISOR_RUN_DIR")]
    pub run_dir: PathBuf,

    /// Directory for per-worker log files.
    #[arg(long, global = true, default_value = "logs", env = "AGENTVISOR_LOG_DIR")]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the supervisor.
    Start {
        /// Fork into the background instead of running in the foreground.
        #[arg(long)]
        detach: bool,
    },
    /// Signal a running supervisor to shut down gracefully.
    Stop,
    /// Stop, then start again (detached).
    Restart,
    /// Print a snapshot of all workers.
    Status {
        /// Emit the raw status report as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn supervisor_config(&self) -> SupervisorConfig {
        let mut cfg = SupervisorConfig::default();
        cfg.config_path = self.config.clone();
        cfg.run_dir = self.run_dir.clone();
        cfg.log_dir = self.log_dir.clone();
        cfg
    }

    /// Dispatches the parsed command. The error path maps to a non-zero
    /// exit code in `main`.
    pub async fn execute(self) -> Result<()> {
        let cfg = self.supervisor_config();
        match self.command {
            Command::Start { detach } => start(cfg, detach).await,
            Command::Stop => stop(&cfg),
            Command::Restart => {
                // A supervisor that was not running is not an error here;
                // restart is "make it run" for operators.
                if let Err(err) = stop(&cfg) {
                    warn!(error = %err, "stop before restart");
                }
                start(cfg, true).await
            }
            Command::Status { json } => print_status(&cfg, json),
        }
    }
}

fn read_pid_file(path: &std::path::Path) -> Option<u32> {
    let raw = std::fs::read_to_string(path).ok()?;
    raw.trim().parse().ok()
}

fn running_supervisor(cfg: &SupervisorConfig) -> Option<u32> {
    read_pid_file(&cfg.supervisor_pid_file()).filter(|&pid| os::pid_alive(pid))
}

async fn start(cfg: SupervisorConfig, detach: bool) -> Result<()> {
    if let Some(pid) = running_supervisor(&cfg) {
        bail!("supervisor already running (pid {pid})");
    }

    if detach {
        return spawn_detached(&cfg);
    }

    let specs = loader::load_with_fallback(&cfg.config_path)
        .context("configuration failed and could not fall back to defaults")?;
    let subs: Vec<std::sync::Arc<dyn Subscribe>> = vec![std::sync::Arc::new(LogWriter)];
    let sup = Supervisor::new(cfg, subs);
    sup.run(specs).await?;
    Ok(())
}

/// Re-executes the current binary in the background, in its own process
/// group, with output appended to the supervisor's own log file.
fn spawn_detached(cfg: &SupervisorConfig) -> Result<()> {
    cfg.ensure_dirs()
        .with_context(|| format!("creating {} and {}", cfg.run_dir.display(), cfg.log_dir.display()))?;

    let exe = std::env::current_exe().context("resolving current executable")?;
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(cfg.supervisor_log_file())
        .with_context(|| format!("opening {}", cfg.supervisor_log_file().display()))?;
    let log_err = log.try_clone()?;

    let mut cmd = std::process::Command::new(exe);
    cmd.arg("start")
        .arg("--config")
        .arg(&cfg.config_path)
        .arg("--run-dir")
        .arg(&cfg.run_dir)
        .arg("--log-dir")
        .arg(&cfg.log_dir)
        .stdin(std::process::Stdio::null())
        .stdout(log)
        .stderr(log_err);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn().context("spawning detached supervisor")?;
    println!("supervisor started (pid {})", child.id());
    Ok(())
}

fn stop(cfg: &SupervisorConfig) -> Result<()> {
    let Some(pid) = running_supervisor(cfg) else {
        bail!("no running supervisor found at {}", cfg.supervisor_pid_file().display());
    };

    os::terminate_pid(pid).with_context(|| format!("signalling supervisor pid {pid}"))?;

    // The supervisor's shutdown latency is bounded by its grace period plus
    // one in-flight stop; poll a little longer than that before giving up.
    let deadline = std::time::Instant::now() + cfg.grace + Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if !os::pid_alive(pid) {
            println!("supervisor stopped");
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(200));
    }
    bail!("supervisor (pid {pid}) did not exit in time");
}

fn print_status(cfg: &SupervisorConfig, json: bool) -> Result<()> {
    let path = cfg.status_file();
    let report = match status::read(&path) {
        Ok(report) => report,
        Err(_) if running_supervisor(cfg).is_none() => {
            bail!("supervisor is not running (no status report at {})", path.display());
        }
        Err(err) => return Err(err).context("reading status report"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stale = !os::pid_alive(report.supervisor_pid);
    println!(
        "supervisor: {:?} (pid {}){}",
        report.supervisor,
        report.supervisor_pid,
        if stale { " [stale report]" } else { "" }
    );
    println!("{:<16} {:<10} {:>8} {:>10} {:>9}", "NAME", "STATE", "PID", "UPTIME", "RESTARTS");
    for w in &report.workers {
        // The pid marker is advisory; cross-check so a dead worker behind a
        // stale report is visible.
        let vanished = w.state == WorkerState::Running
            && w.pid.map(|p| !os::pid_alive(p)).unwrap_or(true);
        let state = if vanished {
            format!("{}?", w.state)
        } else {
            w.state.to_string()
        };
        let pid = w.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        let uptime = w
            .uptime_secs
            .map(format_uptime)
            .unwrap_or_else(|| "-".into());
        println!("{:<16} {:<10} {:>8} {:>10} {:>9}", w.name, state, pid, uptime, w.restart_count);
    }
    Ok(())
}

fn format_uptime(secs: u64) -> String {
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
