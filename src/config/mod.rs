//! # Configuration: worker specs, supervisor settings, loader.
//!
//! Three pieces:
//! - [`WorkerSpec`] — the immutable, declarative description of one worker,
//!   deserialized from the agents file with defaults applied at parse time;
//! - [`SupervisorConfig`] — runtime settings of the supervisor itself
//!   (timings, directories) plus the path scheme for pid/log/status files;
//! - [`loader`] — reads and validates the agents file, bootstrapping a
//!   default one on first run.

pub mod loader;
mod settings;
mod spec;

pub use settings::SupervisorConfig;
pub use spec::{AgentsFile, CommandLine, WorkerSpec};
pub use spec::{ENV_WORKER_NAME, ENV_PROTOCOL_VERSION, PROTOCOL_VERSION};
