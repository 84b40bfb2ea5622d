//! # OS signals as control events.
//!
//! The supervisor never does work inside a signal context. Listener tasks
//! translate signals into [`ControlEvent`]s on an mpsc channel that only the
//! supervisor loop consumes; the loop's timer wait is preempted by the
//! channel, so shutdown latency is bounded by the in-flight stop operation,
//! not the sweep interval.
//!
//! ## Signals
//! **Unix:**
//! - `SIGINT` / `SIGTERM` → [`ControlEvent::Shutdown`]
//! - `SIGHUP` → [`ControlEvent::Reload`]
//!
//! **Elsewhere:** Ctrl-C → [`ControlEvent::Shutdown`]; reload is unavailable.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Control decisions delivered to the supervisor loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// Begin graceful shutdown.
    Shutdown,
    /// Merge newly discovered specs from the agents file.
    Reload,
}

/// Spawns the signal listener tasks and returns the channel they feed.
///
/// The tasks exit when `token` is cancelled. Registration failures surface
/// here, before the loop starts, rather than as silently missing signals.
pub fn spawn_listeners(
    token: &CancellationToken,
) -> std::io::Result<mpsc::Receiver<ControlEvent>> {
    let (tx, rx) = mpsc::channel(8);
    spawn_platform_listeners(tx, token.clone())?;
    Ok(rx)
}

#[cfg(unix)]
fn spawn_platform_listeners(
    tx: mpsc::Sender<ControlEvent>,
    token: CancellationToken,
) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::spawn(async move {
        loop {
            let ev = tokio::select! {
                _ = token.cancelled() => break,
                _ = sigint.recv() => ControlEvent::Shutdown,
                _ = sigterm.recv() => ControlEvent::Shutdown,
                _ = sighup.recv() => ControlEvent::Reload,
            };
            if tx.send(ev).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_platform_listeners(
    tx: mpsc::Sender<ControlEvent>,
    token: CancellationToken,
) -> std::io::Result<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                res = tokio::signal::ctrl_c() => {
                    if res.is_err() || tx.send(ControlEvent::Shutdown).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
    Ok(())
}
