//! Reload semantics: merging newly discovered specs never disturbs live
//! workers.

#![cfg(unix)]

use agentvisor::{
    AgentsFile, CommandLine, Supervisor, SupervisorConfig, WorkerSpec, WorkerState,
};

fn write_agents(cfg: &SupervisorConfig, specs: &[WorkerSpec]) {
    let file = AgentsFile {
        agents: specs.to_vec(),
    };
    std::fs::write(
        &cfg.config_path,
        serde_json::to_string_pretty(&file).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn test_reload_merges_new_spec_and_starts_it() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SupervisorConfig::rooted_at(dir.path());

    let original = WorkerSpec::new("first", CommandLine::Shell("sleep 30".into()));
    write_agents(&cfg, &[original.clone()]);

    let cfg_probe = cfg.clone();
    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![original]).await.unwrap();
    let first_pid = sup.registry().get("first").unwrap().pid();

    // A second worker appears in the file; reload picks it up.
    let second = WorkerSpec::new("second", CommandLine::Shell("sleep 30".into()));
    write_agents(
        &cfg_probe,
        &[
            WorkerSpec::new("first", CommandLine::Shell("sleep 30".into())),
            second,
        ],
    );
    sup.reload().await;

    assert_eq!(sup.registry().len(), 2);
    assert_eq!(
        sup.registry().get("second").unwrap().state(),
        WorkerState::Running
    );
    // The live worker kept its process.
    assert_eq!(sup.registry().get("first").unwrap().pid(), first_pid);

    sup.shutdown().await;
}

#[tokio::test]
async fn test_reload_never_reconfigures_live_worker() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SupervisorConfig::rooted_at(dir.path());

    let original = WorkerSpec::new("keeper", CommandLine::Shell("sleep 30".into()));
    write_agents(&cfg, &[original.clone()]);

    let cfg_probe = cfg.clone();
    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![original]).await.unwrap();

    let mut changed = WorkerSpec::new("keeper", CommandLine::Shell("sleep 30".into()));
    changed.max_restarts = 99;
    write_agents(&cfg_probe, &[changed]);
    sup.reload().await;

    assert_eq!(sup.registry().get("keeper").unwrap().spec().max_restarts, 5);
    assert_eq!(
        sup.registry().get("keeper").unwrap().state(),
        WorkerState::Running
    );

    sup.shutdown().await;
}

#[tokio::test]
async fn test_reload_with_broken_file_keeps_registry() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SupervisorConfig::rooted_at(dir.path());

    let original = WorkerSpec::new("steady", CommandLine::Shell("sleep 30".into()));
    write_agents(&cfg, &[original.clone()]);

    let cfg_probe = cfg.clone();
    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![original]).await.unwrap();

    std::fs::write(&cfg_probe.config_path, "{ definitely not json").unwrap();
    sup.reload().await;

    assert_eq!(sup.registry().len(), 1);
    assert_eq!(
        sup.registry().get("steady").unwrap().state(),
        WorkerState::Running
    );

    sup.shutdown().await;
}

#[tokio::test]
async fn test_reload_updates_spec_of_worker_at_rest() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SupervisorConfig::rooted_at(dir.path());

    let mut resting = WorkerSpec::new("resting", CommandLine::Shell("sleep 30".into()));
    resting.auto_start = false;
    write_agents(&cfg, &[resting.clone()]);

    let cfg_probe = cfg.clone();
    let mut sup = Supervisor::new(cfg, vec![]);
    sup.bootstrap(vec![resting]).await.unwrap();
    assert_eq!(
        sup.registry().get("resting").unwrap().state(),
        WorkerState::Stopped
    );

    let mut changed = WorkerSpec::new("resting", CommandLine::Shell("sleep 30".into()));
    changed.auto_start = false;
    changed.max_restarts = 9;
    write_agents(&cfg_probe, &[changed]);
    sup.reload().await;

    assert_eq!(sup.registry().get("resting").unwrap().spec().max_restarts, 9);
    // Updating a spec at rest does not launch it.
    assert_eq!(
        sup.registry().get("resting").unwrap().state(),
        WorkerState::Stopped
    );

    sup.shutdown().await;
}
