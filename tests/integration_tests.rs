use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use vpptool::domain::{CommitSource, ForceFlags, ImageReference, ToolConfig};
use vpptool::infra::DockerAdapter;
use vpptool::services::{ContainerService, Orchestrator, Stage};
use vpptool::test_support::{MockRunner, MockVcs};

fn test_config() -> ToolConfig {
    ToolConfig {
        setup_image: ImageReference::new("vpptool-images", "setup").unwrap(),
        build_image: ImageReference::new("vpptool-images", "build").unwrap(),
        context: "/home/dev/vpptool/docker".into(),
        container: "vpptool-container".into(),
        deploy_name: "vpp-run".into(),
        plugin: Some(PathBuf::from("/home/dev/acl")),
        startup_file: Some(PathBuf::from("/home/dev/startup.conf")),
        config_file: None,
        commit: None,
        commit_source: CommitSource::Current,
        uid: 1000,
        gid: 100,
        git_name: Some("Dev".into()),
        git_mail: None,
        password: None,
        running: true,
        force: ForceFlags::default(),
    }
}

/// Drives the orchestrator through the real adapter and records the engine argv
fn run_with_runner(config: &ToolConfig, runner: MockRunner, stage: Stage) -> Result<Vec<String>> {
    let adapter = Arc::new(DockerAdapter::with_runner(runner, "docker", false));
    let service = Arc::new(ContainerService::new(adapter.clone()));
    let vcs = Arc::new(MockVcs::new("0123abcd", ""));

    let result = Orchestrator::new(config, service, vcs).run(stage, None);
    let invocations = adapter.runner().invocations();
    result.map(|_| invocations)
}

#[test]
fn test_setup_from_scratch_argv() -> Result<()> {
    let runner = MockRunner::new();
    runner.set_exit_code("image", 1);

    let argv = run_with_runner(&test_config(), runner, Stage::Setup)?;

    assert_eq!(
        argv,
        vec![
            "capture: docker image inspect --format='.' vpptool-images:setup",
            "passthrough: docker build --build-arg IDU=1000 --build-arg IDG=100 \
             --build-arg GIT_NAME=Dev -t vpptool-images:setup /home/dev/vpptool/docker",
            "capture: docker rm -f vpptool-container",
            "passthrough: docker run --name vpptool-container -e CID=0123abcd \
             vpptool-images:setup /scripts/setup",
            "passthrough: docker commit --change=cmd [\"/scripts/start\"] \
             vpptool-container vpptool-images:build",
            "capture: docker rm -f vpptool-container",
        ]
    );
    Ok(())
}

#[test]
fn test_build_argv_with_existing_images() -> Result<()> {
    let argv = run_with_runner(&test_config(), MockRunner::new(), Stage::Build)?;

    assert_eq!(
        argv,
        vec![
            "capture: docker image inspect --format='.' vpptool-images:setup",
            "capture: docker image inspect --format='.' vpptool-images:build",
            "capture: docker rm -f vpptool-container",
            "passthrough: docker run --name vpptool-container \
             -v /home/dev/acl:/opt/vpp/src/plugins/acl vpptool-images:build /scripts/build",
            "passthrough: docker commit --change=cmd [\"/scripts/start\"] \
             vpptool-container vpptool-images:build",
            "capture: docker rm -f vpptool-container",
        ]
    );
    Ok(())
}

#[test]
fn test_cache_commit_keeps_start_command() -> Result<()> {
    let argv = run_with_runner(&test_config(), MockRunner::new(), Stage::Cache)?;

    let commits: Vec<&String> = argv.iter().filter(|a| a.contains(" commit ")).collect();
    assert_eq!(
        commits,
        vec![
            "passthrough: docker commit --change=cmd [\"/scripts/start\"] \
             vpptool-container vpptool-images:build"
        ]
    );
    Ok(())
}

#[test]
fn test_deploy_argv() -> Result<()> {
    let runner = MockRunner::new();
    // nothing to remove yet
    runner.set_exit_code("rm", 1);

    let argv = run_with_runner(&test_config(), runner, Stage::Deploy)?;

    assert_eq!(
        argv,
        vec![
            "capture: docker rm -f vpp-run",
            "passthrough: docker run -it --cap-add=all --privileged -e START_VPP=1 \
             -d --network host --name vpp-run -v /home/dev/acl:/opt/vpp/src/plugins/acl \
             vpptool-images:build",
            "capture: docker cp /home/dev/startup.conf vpp-run:/etc/vpp/startup.conf",
        ]
    );
    Ok(())
}

#[test]
fn test_engine_failure_surfaces_exit_status() {
    let runner = MockRunner::new();
    runner.set_exit_code("run", 125);

    let err = run_with_runner(&test_config(), runner, Stage::Build).unwrap_err();
    let message = format!("{err:#}");

    assert!(message.contains("error building"));
    assert!(message.contains("exited with status 125"));
}
