//! # Runtime events.
//!
//! Worker lifecycle and supervisor control, published by handles and the
//! supervisor loop onto a broadcast [`Bus`] and consumed by subscribers.
//!
//! ```text
//! WorkerHandle ──┐
//! Supervisor  ───┼── publish(Event) ──► Bus ──► listener ──► Subscribe::on_event
//! reload path ───┘
//! ```

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
