//! # Worker registry.
//!
//! The authoritative name→handle mapping. Handles are stored in
//! registration order and iterated in that order, so sweeps and aggregate
//! status output are deterministic.
//!
//! ## Rules
//! - Names are unique; [`Registry::build`] fails on a collision.
//! - Reload merges via [`Registry::add`]: a live handle is never silently
//!   reconfigured — configuration changes apply only to future starts.

use crate::config::{SupervisorConfig, WorkerSpec};
use crate::error::RegistryError;
use crate::events::Bus;
use crate::workers::handle::{WorkerHandle, WorkerSnapshot};

/// What [`Registry::add`] did with a spec during reload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The name was new; a fresh handle was registered.
    Added,
    /// The name existed and the handle was at rest (`Stopped`/`Failed`);
    /// the stored spec was replaced for future starts.
    Updated,
    /// The name existed and the handle was live; the spec was left
    /// untouched.
    SkippedLive,
}

/// Registration-ordered collection of worker handles.
#[derive(Debug)]
pub struct Registry {
    handles: Vec<WorkerHandle>,
    cfg: SupervisorConfig,
    bus: Bus,
}

impl Registry {
    /// Creates one handle per spec.
    ///
    /// Fails with [`RegistryError::DuplicateName`] if two specs share a
    /// name; the loader validates this too, but `build` is also reachable
    /// from embedders with hand-built spec lists.
    pub fn build(
        specs: Vec<WorkerSpec>,
        cfg: &SupervisorConfig,
        bus: Bus,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::empty(cfg, bus);
        registry.handles.reserve(specs.len());
        for spec in specs {
            if registry.position(&spec.name).is_some() {
                return Err(RegistryError::DuplicateName { name: spec.name });
            }
            let handle = WorkerHandle::new(spec, &registry.cfg, registry.bus.clone());
            registry.handles.push(handle);
        }
        Ok(registry)
    }

    /// Creates a registry with no workers.
    pub fn empty(cfg: &SupervisorConfig, bus: Bus) -> Self {
        Self {
            handles: Vec::new(),
            cfg: cfg.clone(),
            bus,
        }
    }

    /// Merges one spec, used by reload. See [`AddOutcome`] for the cases.
    pub fn add(&mut self, spec: WorkerSpec) -> AddOutcome {
        match self.position(&spec.name) {
            None => {
                let handle = WorkerHandle::new(spec, &self.cfg, self.bus.clone());
                self.handles.push(handle);
                AddOutcome::Added
            }
            Some(idx) => {
                let handle = &mut self.handles[idx];
                if handle.state().is_live() {
                    AddOutcome::SkippedLive
                } else {
                    handle.replace_spec(spec, &self.cfg);
                    AddOutcome::Updated
                }
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.handles.iter().position(|h| h.name() == name)
    }

    /// Looks up a handle by name.
    pub fn get(&self, name: &str) -> Option<&WorkerHandle> {
        self.handles.iter().find(|h| h.name() == name)
    }

    /// Looks up a handle by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut WorkerHandle> {
        self.handles.iter_mut().find(|h| h.name() == name)
    }

    /// Handles in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.handles.iter()
    }

    /// Handles in registration order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WorkerHandle> {
        self.handles.iter_mut()
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True when no workers are registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Snapshots of all workers, in registration order.
    pub fn snapshots(&self) -> Vec<WorkerSnapshot> {
        self.handles.iter().map(WorkerHandle::snapshot).collect()
    }
}
