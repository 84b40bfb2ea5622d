//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point for plugging event handlers into the
//! runtime (logging, metrics, alerting). The supervisor drives all
//! subscribers from a single listener task fed by the
//! [`Bus`](crate::events::Bus).
//!
//! [`LogWriter`] is the built-in subscriber: it renders every event through
//! `tracing`.

mod log;
mod subscriber;

pub use log::LogWriter;
pub use subscriber::Subscribe;
