//! Runtime core: the supervisor loop and its surroundings.
//!
//! Internal modules:
//! - [`signals`]: OS signals turned into control events on a channel;
//! - [`status`]: the status report file written after each sweep;
//! - `supervisor`: the control loop state machine.

pub mod signals;
pub mod status;

mod supervisor;

pub use supervisor::{Supervisor, SupervisorState};
