//! # Status report file.
//!
//! The supervisor rewrites one JSON file after every sweep; the `status`
//! CLI command reads it from a different process. The report plus the
//! advisory pid files is the whole cross-process interface, and the CLI
//! cross-checks pids so a stale report is visible.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::core::SupervisorState;
use crate::error::ConfigError;
use crate::workers::WorkerSnapshot;

/// Everything the `status` command needs, serialized after each sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusReport {
    /// Unix timestamp (seconds) of the write.
    pub updated_at: u64,
    /// Supervisor loop state at the time of the write.
    pub supervisor: SupervisorState,
    /// Pid of the supervisor process.
    pub supervisor_pid: u32,
    /// Worker snapshots in registration order.
    pub workers: Vec<WorkerSnapshot>,
}

impl StatusReport {
    /// Builds a report stamped with the current time and process id.
    pub fn now(supervisor: SupervisorState, workers: Vec<WorkerSnapshot>) -> Self {
        Self {
            updated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            supervisor,
            supervisor_pid: std::process::id(),
            workers,
        }
    }
}

/// Writes the report as pretty JSON. Single writer, so a plain write is
/// enough; a reader catching a torn file sees a parse error and retries on
/// the next invocation.
pub fn write(path: &Path, report: &StatusReport) -> Result<(), ConfigError> {
    let body = serde_json::to_string_pretty(report).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, body + "\n").map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a report back. Used by the `status` CLI.
pub fn read(path: &Path) -> Result<StatusReport, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::WorkerState;

    #[test]
    fn test_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        let report = StatusReport::now(
            SupervisorState::Running,
            vec![WorkerSnapshot {
                name: "scout".into(),
                state: WorkerState::Failed,
                pid: None,
                started_at: None,
                restart_count: 3,
                uptime_secs: None,
            }],
        );

        write(&path, &report).unwrap();
        let back = read(&path).unwrap();
        assert_eq!(back.supervisor, SupervisorState::Running);
        assert_eq!(back.workers.len(), 1);
        assert_eq!(back.workers[0].state, WorkerState::Failed);
        assert_eq!(back.workers[0].restart_count, 3);
    }
}
