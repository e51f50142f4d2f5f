use super::runner::{CommandRunner, ProcessError, SystemRunner};
use crate::domain::{BuildSpec, ContainerEngine, ImageReference, RunSpec};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_ENGINE: &str = "docker";

/// Drives the engine CLI (`docker`, or anything argument-compatible with it)
#[derive(Debug)]
pub struct DockerAdapter<R = SystemRunner> {
    runner: R,
    program: String,
    quiet: bool,
}

impl DockerAdapter<SystemRunner> {
    pub fn new(program: impl Into<String>, quiet: bool) -> Self {
        Self::with_runner(SystemRunner::new(), program, quiet)
    }
}

impl Default for DockerAdapter<SystemRunner> {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE, false)
    }
}

impl<R: CommandRunner> DockerAdapter<R> {
    pub fn with_runner(runner: R, program: impl Into<String>, quiet: bool) -> Self {
        Self {
            runner,
            program: program.into(),
            quiet,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Long running verbs stream to the terminal unless running quietly
    fn run_verb(&self, args: Vec<String>) -> Result<(), ProcessError> {
        if self.quiet {
            self.runner.capture(&self.program, &args).map(|_| ())
        } else {
            self.runner.passthrough(&self.program, &args)
        }
    }

    fn engine(&self, args: Vec<String>, context: &str) -> Result<()> {
        self.run_verb(args).with_context(|| context.to_string())
    }
}

impl<R: CommandRunner> ContainerEngine for DockerAdapter<R> {
    fn image_exists(&self, image: &ImageReference) -> bool {
        let args = strings(["image", "inspect", "--format='.'"], [image.to_string()]);
        match self.runner.capture(&self.program, &args) {
            Ok(_) => true,
            Err(e) => {
                debug!("image {image} not available: {e}");
                false
            }
        }
    }

    fn remove_container(&self, name: &str) -> Result<()> {
        let args = strings(["rm", "-f"], [name.to_string()]);
        if let Err(e) = self.runner.capture(&self.program, &args) {
            warn!("could not remove container {name} (it may not exist): {e}");
        }

        Ok(())
    }

    fn build_image(&self, spec: &BuildSpec) -> Result<()> {
        let mut args: Vec<String> = vec!["build".into()];

        for flag in spec.extra_flags {
            args.push((*flag).into());
        }

        for arg in spec.build_args {
            args.push("--build-arg".into());
            args.push(arg.to_string());
        }

        args.push("-t".into());
        args.push(spec.target.to_string());
        args.push(spec.context.into());

        self.engine(
            args,
            &format!("building image {} from {}", spec.target, spec.context),
        )
    }

    fn run_named(&self, spec: &RunSpec) -> Result<()> {
        let mut args: Vec<String> = vec!["run".into(), "--name".into(), spec.name.into()];

        push_env_and_mounts(&mut args, spec);
        args.push(spec.image.to_string());

        if let Some(script) = spec.script {
            args.push(script.into());
        }

        self.engine(
            args,
            &format!("running container {} from {}", spec.name, spec.image),
        )
    }

    fn run_detached_privileged(&self, spec: &RunSpec) -> Result<()> {
        let mut args = strings(["run", "-it", "--cap-add=all", "--privileged"], []);

        for env in spec.env {
            args.push("-e".into());
            args.push(env.clone());
        }

        args.extend(strings(["-d", "--network", "host", "--name"], [spec.name.to_string()]));

        for mount in spec.mounts {
            args.push("-v".into());
            args.push(mount.to_string());
        }

        args.push(spec.image.to_string());

        self.engine(
            args,
            &format!("deploying container {} from {}", spec.name, spec.image),
        )
    }

    fn commit(&self, name: &str, image: &ImageReference, entrypoint: Option<&str>) -> Result<()> {
        let mut args: Vec<String> = vec!["commit".into()];

        if let Some(cmd) = entrypoint {
            args.push(format!("--change=cmd [\"{cmd}\"]"));
        }

        args.push(name.into());
        args.push(image.to_string());

        self.engine(args, &format!("committing container {name} to {image}"))
    }

    fn copy_to_container_etc(&self, name: &str, host_path: &Path, etc_path: &str) -> Result<()> {
        let args = vec![
            "cp".to_string(),
            host_path.to_string_lossy().into_owned(),
            format!("{name}:/etc/{etc_path}"),
        ];

        self.runner
            .capture(&self.program, &args)
            .map(|_| ())
            .with_context(|| format!("copying {:?} to {name}:/etc/{etc_path}", host_path))
    }
}

fn push_env_and_mounts(args: &mut Vec<String>, spec: &RunSpec) {
    for env in spec.env {
        args.push("-e".into());
        args.push(env.clone());
    }

    for mount in spec.mounts {
        args.push("-v".into());
        args.push(mount.to_string());
    }
}

fn strings<const N: usize, const M: usize>(fixed: [&str; N], owned: [String; M]) -> Vec<String> {
    fixed
        .iter()
        .map(|s| s.to_string())
        .chain(owned)
        .collect()
}
