//! Sweep and shutdown behavior of the supervisor state machine, driven
//! manually through `bootstrap` / `sweep_once` / `shutdown` so no timing on
//! the real tick interval is involved.

#![cfg(unix)]

use std::time::Duration;

use agentvisor::{
    CommandLine, Supervisor, SupervisorConfig, SupervisorState, WorkerSpec, WorkerState,
};

fn scratch() -> (tempfile::TempDir, SupervisorConfig) {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = SupervisorConfig::rooted_at(dir.path());
    // Keep forced-kill escalation quick in tests.
    cfg.grace = Duration::from_secs(2);
    (dir, cfg)
}

async fn wait_until_dead(sup: &mut Supervisor, name: &str) {
    for _ in 0..100 {
        if !sup.registry_mut().get_mut(name).unwrap().is_alive() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("worker {name} did not exit in time");
}

#[tokio::test]
async fn test_sweep_restarts_crashed_worker() {
    let (_dir, cfg) = scratch();
    let spec = WorkerSpec::new("flappy", CommandLine::Shell("exit 1".into()));

    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![spec]).await.unwrap();
    assert_eq!(sup.state(), SupervisorState::Running);

    wait_until_dead(&mut sup, "flappy").await;
    sup.sweep_once().await;

    let snap = sup.registry().get("flappy").unwrap().snapshot();
    assert_eq!(snap.restart_count, 1);
    assert_eq!(snap.state, WorkerState::Running);

    sup.shutdown().await;
}

#[tokio::test]
async fn test_sweep_never_restarts_when_not_eligible() {
    let (_dir, cfg) = scratch();
    let mut spec = WorkerSpec::new("oneshot", CommandLine::Shell("exit 0".into()));
    spec.restart_on_crash = false;

    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![spec]).await.unwrap();

    wait_until_dead(&mut sup, "oneshot").await;
    sup.sweep_once().await;

    let snap = sup.registry().get("oneshot").unwrap().snapshot();
    assert_eq!(snap.state, WorkerState::Stopped);
    assert_eq!(snap.restart_count, 0);
    assert_eq!(snap.pid, None);

    // Further sweeps keep their hands off a stopped worker.
    sup.sweep_once().await;
    assert_eq!(
        sup.registry().get("oneshot").unwrap().state(),
        WorkerState::Stopped
    );

    sup.shutdown().await;
}

#[tokio::test]
async fn test_sweep_marks_failed_after_budget_and_leaves_it_alone() {
    let (_dir, cfg) = scratch();
    let mut spec = WorkerSpec::new("doomed", CommandLine::Shell("exit 1".into()));
    spec.max_restarts = 1;

    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![spec]).await.unwrap();

    wait_until_dead(&mut sup, "doomed").await;
    sup.sweep_once().await; // restart 1 admitted
    wait_until_dead(&mut sup, "doomed").await;
    sup.sweep_once().await; // budget exhausted

    assert_eq!(
        sup.registry().get("doomed").unwrap().state(),
        WorkerState::Failed
    );

    // A Failed worker is skipped by later sweeps.
    sup.sweep_once().await;
    assert_eq!(
        sup.registry().get("doomed").unwrap().state(),
        WorkerState::Failed
    );

    sup.shutdown().await;
}

#[tokio::test]
async fn test_autostart_false_is_not_launched() {
    let (_dir, cfg) = scratch();
    let mut manual = WorkerSpec::new("manual", CommandLine::Shell("sleep 30".into()));
    manual.auto_start = false;
    let auto = WorkerSpec::new("auto", CommandLine::Shell("sleep 30".into()));

    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![manual, auto]).await.unwrap();

    assert_eq!(
        sup.registry().get("manual").unwrap().state(),
        WorkerState::Stopped
    );
    assert_eq!(
        sup.registry().get("auto").unwrap().state(),
        WorkerState::Running
    );

    sup.shutdown().await;
}

#[tokio::test]
async fn test_spawn_failure_is_not_fatal_to_bootstrap() {
    let (_dir, cfg) = scratch();
    let broken = WorkerSpec::new(
        "broken",
        CommandLine::Argv(vec!["/nonexistent/binary".into()]),
    );
    let healthy = WorkerSpec::new("healthy", CommandLine::Shell("sleep 30".into()));

    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![broken, healthy]).await.unwrap();
    assert_eq!(sup.state(), SupervisorState::Running);

    assert_eq!(
        sup.registry().get("broken").unwrap().state(),
        WorkerState::Stopped
    );
    assert_eq!(
        sup.registry().get("healthy").unwrap().state(),
        WorkerState::Running
    );

    sup.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_workers_and_cleans_run_dir() {
    let (_dir, cfg) = scratch();
    let cfg_probe = cfg.clone();
    let spec = WorkerSpec::new("sleeper", CommandLine::Shell("sleep 30".into()));

    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![spec]).await.unwrap();
    assert!(cfg_probe.supervisor_pid_file().exists());
    assert!(cfg_probe.status_file().exists());

    sup.shutdown().await;
    assert_eq!(sup.state(), SupervisorState::Terminated);
    assert_eq!(
        sup.registry().get("sleeper").unwrap().state(),
        WorkerState::Stopped
    );
    assert!(!cfg_probe.supervisor_pid_file().exists());
    assert!(!cfg_probe.status_file().exists());
    assert!(!cfg_probe.worker_pid_file("sleeper").exists());
}

#[tokio::test]
async fn test_status_report_tracks_states() {
    let (_dir, cfg) = scratch();
    let cfg_probe = cfg.clone();
    let spec = WorkerSpec::new("sleeper", CommandLine::Shell("sleep 30".into()));

    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![spec]).await.unwrap();
    sup.sweep_once().await;

    let report = agentvisor::status::read(&cfg_probe.status_file()).unwrap();
    assert_eq!(report.supervisor, SupervisorState::Running);
    assert_eq!(report.workers.len(), 1);
    assert_eq!(report.workers[0].name, "sleeper");
    assert_eq!(report.workers[0].state, WorkerState::Running);
    assert!(report.workers[0].pid.is_some());

    sup.shutdown().await;
}
