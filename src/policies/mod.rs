//! # Restart policy.
//!
//! Decides whether a crashed worker may be relaunched. The only policy is a
//! sliding-window rate limiter ([`RestartBudget`]).

mod restart;

pub use restart::{RestartBudget, RestartTracker};
