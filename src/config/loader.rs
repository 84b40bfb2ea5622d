//! # Agents file loader.
//!
//! Produces a validated [`WorkerSpec`] list from the agents file.
//!
//! ## Rules
//! - Missing file: the built-in defaults are written to the path first
//!   ("first run bootstraps itself"), then returned. Re-running the loader
//!   on the freshly written file reproduces identical specs.
//! - Parse or validation failure at startup: [`load_with_fallback`] logs the
//!   error and returns the built-in defaults, so the supervisor still comes
//!   up with something running.
//! - I/O failure (unreadable file, unwritable bootstrap path): no fallback;
//!   the error propagates and the CLI exits non-zero.

use std::path::Path;

use tracing::{info, warn};

use crate::config::spec::{AgentsFile, CommandLine, WorkerSpec};
use crate::error::ConfigError;

/// Built-in minimal spec set used for bootstrap and as the parse-failure
/// fallback.
pub fn default_specs() -> Vec<WorkerSpec> {
    vec![WorkerSpec::new(
        "heartbeat",
        CommandLine::Shell("sleep 300".into()),
    )]
}

/// Loads the agents file, writing the built-in defaults first if it is
/// missing.
pub fn load_or_bootstrap(path: &Path) -> Result<Vec<WorkerSpec>, ConfigError> {
    if !path.exists() {
        bootstrap(path)?;
        info!(path = %path.display(), "agents file missing; wrote built-in defaults");
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: AgentsFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(path, &file.agents)?;
    Ok(file.agents)
}

/// Loads the agents file, falling back to the built-in defaults on parse or
/// validation failure. Only I/O errors escape.
pub fn load_with_fallback(path: &Path) -> Result<Vec<WorkerSpec>, ConfigError> {
    match load_or_bootstrap(path) {
        Ok(specs) => Ok(specs),
        Err(err) if err.is_fallback_eligible() => {
            warn!(
                error = %err,
                label = err.as_label(),
                "agents file unusable; falling back to built-in defaults"
            );
            Ok(default_specs())
        }
        Err(err) => Err(err),
    }
}

fn bootstrap(path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let file = AgentsFile {
        agents: default_specs(),
    };
    // Serialize before touching the file so a failure leaves no partial
    // bootstrap behind.
    let body = serde_json::to_string_pretty(&file).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, body + "\n").map_err(io_err)
}

fn validate(path: &Path, specs: &[WorkerSpec]) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    };

    let mut seen = std::collections::HashSet::new();
    for spec in specs {
        spec.validate().map_err(invalid)?;
        if !seen.insert(spec.name.as_str()) {
            return Err(invalid(format!("duplicate worker name {:?}", spec.name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");

        let first = load_or_bootstrap(&path).unwrap();
        let bytes_first = std::fs::read(&path).unwrap();
        let second = load_or_bootstrap(&path).unwrap();
        let bytes_second = std::fs::read(&path).unwrap();

        assert_eq!(first, default_specs());
        assert_eq!(first, second);
        assert_eq!(bytes_first, bytes_second);
    }

    #[test]
    fn test_parse_error_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        std::fs::write(&path, "{ not json").unwrap();

        let specs = load_with_fallback(&path).unwrap();
        assert_eq!(specs, default_specs());
    }

    #[test]
    fn test_parse_error_is_an_error_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        std::fs::write(&path, r#"{"agents": [{"name": "x"}]}"#).unwrap();

        let err = load_or_bootstrap(&path).unwrap_err();
        assert_eq!(err.as_label(), "config_parse_error");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        std::fs::write(
            &path,
            r#"{"agents": [
                {"name": "scout", "command": "sleep 1"},
                {"name": "scout", "command": "sleep 2"}
            ]}"#,
        )
        .unwrap();

        let err = load_or_bootstrap(&path).unwrap_err();
        assert_eq!(err.as_label(), "config_invalid");
    }

    #[test]
    fn test_file_order_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        std::fs::write(
            &path,
            r#"{"agents": [
                {"name": "c", "command": "sleep 1"},
                {"name": "a", "command": "sleep 1"},
                {"name": "b", "command": "sleep 1"}
            ]}"#,
        )
        .unwrap();

        let specs = load_or_bootstrap(&path).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
