//! # Worker processes: handles, registry, OS helpers.
//!
//! A [`WorkerHandle`] owns exactly one external process's lifecycle; the
//! [`Registry`] owns the name→handle mapping in stable registration order.
//! [`os`] holds the unix process-group plumbing.

pub mod os;

mod handle;
mod registry;

pub use handle::{StopOutcome, WorkerHandle, WorkerSnapshot, WorkerState};
pub use registry::{AddOutcome, Registry};
