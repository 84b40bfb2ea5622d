//! # Worker specification.
//!
//! [`WorkerSpec`] is the declarative, immutable description of one supervised
//! worker, loaded from the agents file. Optional fields take documented
//! defaults at parse time; unknown fields are rejected so a typo in the
//! config surfaces as a parse error instead of silently doing nothing.
//!
//! The on-disk shape is a JSON object:
//! ```json
//! {
//!   "agents": [
//!     {
//!       "name": "scout",
//!       "command": "python3 scout.py --poll",
//!       "working_dir": "/srv/agents/scout",
//!       "auto_start": true,
//!       "restart_on_crash": true,
//!       "max_restarts": 5,
//!       "restart_window": 60,
//!       "env_vars": { "SCOUT_MODE": "full" }
//!     }
//!   ]
//! }
//! ```
//!
//! `command` accepts either a shell line (run via `sh -c`) or an argv array
//! (`["python3", "scout.py", "--poll"]`, run without a shell).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable carrying the worker's own name.
pub const ENV_WORKER_NAME: &str = "AGENT_NAME";

/// Environment variable carrying the supervisor protocol version.
pub const ENV_PROTOCOL_VERSION: &str = "AGENT_PROTOCOL_VERSION";

/// Version of the supervisor/worker environment contract.
pub const PROTOCOL_VERSION: &str = "1";

/// How a worker's executable is invoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    /// A single shell line, run via `sh -c`.
    Shell(String),
    /// An explicit program + arguments, run without a shell.
    Argv(Vec<String>),
}

impl CommandLine {
    /// Splits into `(program, args)` for spawning.
    ///
    /// Returns `None` for an empty argv or a blank shell line.
    pub fn program_and_args(&self) -> Option<(String, Vec<String>)> {
        match self {
            CommandLine::Shell(line) => {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                Some(("sh".into(), vec!["-c".into(), line.into()]))
            }
            CommandLine::Argv(argv) => {
                let (program, args) = argv.split_first()?;
                if program.trim().is_empty() {
                    return None;
                }
                Some((program.clone(), args.to_vec()))
            }
        }
    }

    /// Human-readable rendering for logs and `status` output.
    pub fn display(&self) -> String {
        match self {
            CommandLine::Shell(line) => line.clone(),
            CommandLine::Argv(argv) => argv.join(" "),
        }
    }
}

/// Declarative description of one supervised worker.
///
/// Immutable once loaded; the live runtime state lives in
/// [`WorkerHandle`](crate::workers::WorkerHandle). Names must be unique
/// across the registry (enforced by the loader and by
/// [`Registry::build`](crate::workers::Registry::build)).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerSpec {
    /// Unique worker name; also the key for pid and log files.
    pub name: String,
    /// Executable invocation.
    pub command: CommandLine,
    /// Directory the process is launched in.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Launched automatically when the supervisor starts.
    #[serde(default = "default_true")]
    pub auto_start: bool,
    /// Eligible for crash-triggered restarts.
    #[serde(default = "default_true")]
    pub restart_on_crash: bool,
    /// Ceiling on restarts inside one window.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    /// Sliding restart window, in seconds.
    #[serde(default = "default_restart_window")]
    pub restart_window: u64,
    /// Extra environment variables, merged over the inherited environment.
    ///
    /// `AGENT_NAME` and `AGENT_PROTOCOL_VERSION` are always injected on top.
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}

impl WorkerSpec {
    /// Creates a spec with all optional fields at their defaults.
    pub fn new(name: impl Into<String>, command: CommandLine) -> Self {
        Self {
            name: name.into(),
            command,
            working_dir: default_working_dir(),
            auto_start: default_true(),
            restart_on_crash: default_true(),
            max_restarts: default_max_restarts(),
            restart_window: default_restart_window(),
            env_vars: BTreeMap::new(),
        }
    }

    /// The restart window as a [`Duration`].
    pub fn restart_window(&self) -> Duration {
        Duration::from_secs(self.restart_window)
    }

    /// Checks the rules the type system cannot express.
    ///
    /// Returns the first violated rule as a human-readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("worker name must not be empty".into());
        }
        if self
            .name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
        {
            return Err(format!(
                "worker name {:?} must not contain path separators or whitespace",
                self.name
            ));
        }
        if self.command.program_and_args().is_none() {
            return Err(format!("worker {:?} has an empty command", self.name));
        }
        Ok(())
    }
}

/// On-disk shape of the agents file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentsFile {
    /// Declared workers, in file order (which becomes registration order).
    pub agents: Vec<WorkerSpec>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_max_restarts() -> u32 {
    5
}

fn default_restart_window() -> u64 {
    60
}
