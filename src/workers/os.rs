//! # OS process-group plumbing.
//!
//! Workers are spawned into their own process group so a group signal also
//! reaps any children the worker itself forked. On unix these helpers wrap
//! `nix`; elsewhere they report failure and callers fall back to
//! single-process kills via [`tokio::process::Child`].

/// Sends a graceful termination signal (SIGTERM) to the worker's process
/// group.
#[cfg(unix)]
pub fn terminate_group(pid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);
    killpg(pgid, Signal::SIGTERM).map_err(std::io::Error::from)
}

/// Forcefully kills (SIGKILL) the worker's process group.
#[cfg(unix)]
pub fn kill_group(pid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);
    killpg(pgid, Signal::SIGKILL).map_err(std::io::Error::from)
}

/// Sends a graceful termination signal to a single process (used against the
/// supervisor's own pid by the `stop` CLI).
#[cfg(unix)]
pub fn terminate_pid(pid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)
}

/// Non-reaping liveness probe: signal 0 to the pid.
///
/// Advisory only: a recycled pid answers for a dead worker, and an
/// unreaped zombie still answers. Inside the supervisor the authoritative
/// probe is [`WorkerHandle::is_alive`](crate::workers::WorkerHandle::is_alive);
/// this one serves the out-of-process `status` command, where the pid file
/// is all there is.
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
pub fn terminate_group(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "process groups are unix-only",
    ))
}

#[cfg(not(unix))]
pub fn kill_group(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "process groups are unix-only",
    ))
}

#[cfg(not(unix))]
pub fn terminate_pid(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "signalling by pid is unix-only",
    ))
}

#[cfg(not(unix))]
pub fn pid_alive(_pid: u32) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_pid_alive_for_own_process() {
        assert!(pid_alive(std::process::id()));
    }

    #[test]
    fn test_pid_alive_false_for_unused_pid() {
        // Pids near the wrap-around point are vanishingly unlikely to be in
        // use on a test machine.
        assert!(!pid_alive(4_000_000));
    }
}
