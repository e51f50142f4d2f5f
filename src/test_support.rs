use crate::domain::{BuildSpec, ContainerEngine, ImageReference, RunSpec, VersionControl};
use crate::infra::runner::{CommandOutput, CommandRunner, ProcessError, command_line};
use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub name: String,
    pub image: String,
    pub env: Vec<String>,
    pub mounts: Vec<String>,
    pub script: Option<String>,
    pub detached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBuild {
    pub context: String,
    pub target: String,
    pub build_args: Vec<String>,
    pub extra_flags: Vec<String>,
}

/// In-memory engine recording every call as `verb:args`
#[derive(Debug, Default)]
pub struct MockEngine {
    images: RwLock<HashSet<String>>,
    containers: RwLock<HashSet<String>>,
    commands: RwLock<Vec<String>>,
    runs: RwLock<Vec<RecordedRun>>,
    builds: RwLock<Vec<RecordedBuild>>,
    entrypoints: RwLock<Vec<Option<String>>>,
    fail_on: RwLock<HashMap<String, Option<usize>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&self, image: &ImageReference) {
        self.images.write().unwrap().insert(image.to_string());
    }

    pub fn add_container(&self, name: &str) {
        self.containers.write().unwrap().insert(name.to_string());
    }

    pub fn has_image(&self, image: &ImageReference) -> bool {
        self.images.read().unwrap().contains(&image.to_string())
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.containers.read().unwrap().contains(name)
    }

    /// Every call to `operation` fails from now on
    pub fn set_fail_on(&self, operation: &str) {
        self.fail_on
            .write()
            .unwrap()
            .insert(operation.to_string(), None);
    }

    /// The next `times` calls to `operation` fail
    pub fn set_fail_times(&self, operation: &str, times: usize) {
        self.fail_on
            .write()
            .unwrap()
            .insert(operation.to_string(), Some(times));
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    /// Recorded commands without the `exists:` probes
    pub fn get_actions(&self) -> Vec<String> {
        self.get_commands()
            .into_iter()
            .filter(|c| !c.starts_with("exists:"))
            .collect()
    }

    pub fn get_runs(&self) -> Vec<RecordedRun> {
        self.runs.read().unwrap().clone()
    }

    pub fn get_builds(&self) -> Vec<RecordedBuild> {
        self.builds.read().unwrap().clone()
    }

    pub fn get_entrypoints(&self) -> Vec<Option<String>> {
        self.entrypoints.read().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.get_commands()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record_command(&self, cmd: String) {
        self.commands.write().unwrap().push(cmd);
    }

    fn check_fail(&self, operation: &str) -> Result<()> {
        let mut fail_on = self.fail_on.write().unwrap();
        match fail_on.get_mut(operation) {
            Some(None) => bail!("Mock failure on: {}", operation),
            Some(Some(0)) | None => Ok(()),
            Some(Some(remaining)) => {
                *remaining -= 1;
                bail!("Mock failure on: {}", operation)
            }
        }
    }

    fn record_run(&self, spec: &RunSpec, detached: bool) {
        self.runs.write().unwrap().push(RecordedRun {
            name: spec.name.to_string(),
            image: spec.image.to_string(),
            env: spec.env.to_vec(),
            mounts: spec.mounts.iter().map(|m| m.to_string()).collect(),
            script: spec.script.map(str::to_string),
            detached,
        });
    }
}

impl ContainerEngine for MockEngine {
    fn image_exists(&self, image: &ImageReference) -> bool {
        self.record_command(format!("exists:{image}"));
        self.check_fail("exists").is_ok() && self.has_image(image)
    }

    fn remove_container(&self, name: &str) -> Result<()> {
        self.record_command(format!("remove:{name}"));
        self.containers.write().unwrap().remove(name);
        Ok(())
    }

    fn build_image(&self, spec: &BuildSpec) -> Result<()> {
        self.record_command(format!("build:{}", spec.target));
        self.builds.write().unwrap().push(RecordedBuild {
            context: spec.context.to_string(),
            target: spec.target.to_string(),
            build_args: spec.build_args.iter().map(|a| a.to_string()).collect(),
            extra_flags: spec.extra_flags.iter().map(|f| f.to_string()).collect(),
        });
        self.check_fail("build")?;

        self.add_image(spec.target);
        Ok(())
    }

    fn run_named(&self, spec: &RunSpec) -> Result<()> {
        self.record_command(format!("run:{}:{}", spec.name, spec.image));
        self.record_run(spec, false);
        self.add_container(spec.name);
        self.check_fail("run")
    }

    fn run_detached_privileged(&self, spec: &RunSpec) -> Result<()> {
        self.record_command(format!("deploy:{}:{}", spec.name, spec.image));
        self.record_run(spec, true);
        self.check_fail("deploy")?;

        if self.has_container(spec.name) {
            bail!("container name {} is already in use", spec.name);
        }
        self.add_container(spec.name);
        Ok(())
    }

    fn commit(&self, name: &str, image: &ImageReference, entrypoint: Option<&str>) -> Result<()> {
        self.record_command(format!("commit:{name}:{image}"));
        self.entrypoints
            .write()
            .unwrap()
            .push(entrypoint.map(str::to_string));
        self.check_fail("commit")?;

        self.add_image(image);
        Ok(())
    }

    fn copy_to_container_etc(&self, name: &str, _host_path: &Path, etc_path: &str) -> Result<()> {
        self.record_command(format!("copy:{name}:/etc/{etc_path}"));
        self.check_fail("copy")
    }
}

/// Version control stub returning fixed commit ids
#[derive(Debug, Default)]
pub struct MockVcs {
    current: String,
    parent: String,
    calls: RwLock<Vec<&'static str>>,
}

impl MockVcs {
    pub fn new(current: &str, parent: &str) -> Self {
        Self {
            current: current.to_string(),
            parent: parent.to_string(),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn get_calls(&self) -> Vec<&'static str> {
        self.calls.read().unwrap().clone()
    }
}

impl VersionControl for MockVcs {
    fn current_commit(&self) -> String {
        self.calls.write().unwrap().push("current");
        self.current.clone()
    }

    fn parent_commit(&self) -> String {
        self.calls.write().unwrap().push("parent");
        self.parent.clone()
    }
}

/// Runner that records argv and answers from scripted responses keyed by the first argument
#[derive(Debug, Default)]
pub struct MockRunner {
    invocations: RwLock<Vec<String>>,
    inputs: RwLock<Vec<String>>,
    exit_codes: RwLock<HashMap<String, i32>>,
    outputs: RwLock<HashMap<String, String>>,
    spawn_failures: RwLock<HashSet<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_exit_code(&self, verb: &str, code: i32) {
        self.exit_codes
            .write()
            .unwrap()
            .insert(verb.to_string(), code);
    }

    pub fn set_output(&self, verb: &str, output: &str) {
        self.outputs
            .write()
            .unwrap()
            .insert(verb.to_string(), output.to_string());
    }

    pub fn set_spawn_failure(&self, verb: &str) {
        self.spawn_failures.write().unwrap().insert(verb.to_string());
    }

    pub fn invocations(&self) -> Vec<String> {
        self.invocations.read().unwrap().clone()
    }

    /// Everything written to stdin, one entry per call
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.read().unwrap().clone()
    }

    fn respond(&self, mode: &str, program: &str, args: &[String]) -> Result<String, ProcessError> {
        self.invocations
            .write()
            .unwrap()
            .push(format!("{mode}: {}", command_line(program, args)));

        let verb = args.first().map(String::as_str).unwrap_or_default();

        if self.spawn_failures.read().unwrap().contains(verb) {
            return Err(ProcessError::Spawn {
                program: program.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "mock spawn failure"),
            });
        }

        let output = self
            .outputs
            .read()
            .unwrap()
            .get(verb)
            .cloned()
            .unwrap_or_default();

        match self.exit_codes.read().unwrap().get(verb) {
            Some(&code) if code != 0 => Err(ProcessError::Exit {
                program: program.to_string(),
                code: Some(code),
                output,
            }),
            _ => Ok(output),
        }
    }
}

impl CommandRunner for MockRunner {
    fn capture(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProcessError> {
        self.respond("capture", program, args)
            .map(|combined| CommandOutput { combined })
    }

    fn capture_with_input(
        &self,
        program: &str,
        args: &[String],
        input: &str,
    ) -> Result<CommandOutput, ProcessError> {
        self.inputs.write().unwrap().push(input.to_string());
        self.capture(program, args)
    }

    fn passthrough(&self, program: &str, args: &[String]) -> Result<(), ProcessError> {
        self.respond("passthrough", program, args).map(|_| ())
    }
}
