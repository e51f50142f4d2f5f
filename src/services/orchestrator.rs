use super::ContainerService;
use super::stages::{
    BUILD_SCRIPT, CACHE_SCRIPT, CONFIG_FILE_DEST, ImageKind, Prerequisite, SETUP_SCRIPT,
    START_SCRIPT, STARTUP_FILE_DEST, Stage, needs_rebuild,
};
use crate::domain::{
    BindMount, BuildArg, BuildSpec, CommitSource, ImageReference, PasswordHasher, RunSpec,
    ToolConfig, VersionControl,
};
use anyhow::{Context, Result, bail};
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Sequences the workflow stages against the container engine
pub struct Orchestrator<'a> {
    config: &'a ToolConfig,
    container_service: Arc<ContainerService>,
    vcs: Arc<dyn VersionControl>,
    password_hasher: Option<Arc<dyn PasswordHasher>>,
    commit: OnceCell<String>,
    completed: RefCell<Vec<Stage>>,
    /// Image existence seen during this invocation
    images: RefCell<HashMap<ImageKind, bool>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a ToolConfig,
        container_service: Arc<ContainerService>,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        Self {
            config,
            container_service,
            vcs,
            password_hasher: None,
            commit: OnceCell::new(),
            completed: RefCell::new(Vec::new()),
            images: RefCell::new(HashMap::new()),
        }
    }

    /// Needed by `install` when the configuration carries a password
    pub fn with_password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.password_hasher = Some(hasher);
        self
    }

    /// Runs `stage` after bringing its prerequisite images up to date
    pub fn run(&self, stage: Stage, name: Option<&str>) -> Result<()> {
        let definition = stage.definition();
        if !definition.takes_name && name.is_some() {
            bail!("{stage} does not take a container name");
        }

        self.ensure_prerequisites(stage)?;
        self.execute(stage, name)
    }

    /// Returns whether anything upstream of `stage` was (re)built
    fn ensure_prerequisites(&self, stage: Stage) -> Result<bool> {
        let mut rebuilt = false;

        for prerequisite in stage.definition().prerequisites {
            let upstream = self.ensure_prerequisites(prerequisite.producer)?;

            if self.has_run(prerequisite.producer) {
                rebuilt = true;
                continue;
            }

            if upstream || self.is_stale(prerequisite) {
                self.execute(prerequisite.producer, None)?;
                rebuilt = true;
            }
        }

        Ok(rebuilt)
    }

    fn is_stale(&self, prerequisite: &Prerequisite) -> bool {
        let image = self.image(prerequisite.image);
        let exists = self.image_exists(prerequisite.image);
        let forced = prerequisite.force.is_set(&self.config.force);

        debug!(
            "{image}: exists={exists} forced={forced} (needed by {})",
            prerequisite.producer
        );

        needs_rebuild(exists, forced)
    }

    fn image_exists(&self, kind: ImageKind) -> bool {
        if let Some(&exists) = self.images.borrow().get(&kind) {
            return exists;
        }

        let exists = self.container_service.image_exists(self.image(kind));
        self.images.borrow_mut().insert(kind, exists);
        exists
    }

    fn has_run(&self, stage: Stage) -> bool {
        self.completed.borrow().contains(&stage)
    }

    fn image(&self, kind: ImageKind) -> &ImageReference {
        match kind {
            ImageKind::Setup => &self.config.setup_image,
            ImageKind::Build => &self.config.build_image,
        }
    }

    fn execute(&self, stage: Stage, name: Option<&str>) -> Result<()> {
        let name = name.unwrap_or(&self.config.deploy_name);

        debug!("running stage {stage}");
        match stage {
            Stage::Install => self.install(),
            Stage::Setup => self.setup(),
            Stage::Cache => self.cache(),
            Stage::Build => self.build(),
            Stage::Deploy => self.deploy(name),
            Stage::Configure => self.configure(name),
        }?;

        if let Some(kind) = stage.definition().produces {
            self.images.borrow_mut().insert(kind, true);
        }
        self.completed.borrow_mut().push(stage);
        Ok(())
    }

    /// Builds the setup image from the configured context
    pub fn install(&self) -> Result<()> {
        let config = self.config;
        info!("building setup image {}...", config.setup_image);

        let mut build_args = vec![
            BuildArg::new("IDU", config.uid),
            BuildArg::new("IDG", config.gid),
        ];
        if let Some(git_name) = &config.git_name {
            build_args.push(BuildArg::new("GIT_NAME", git_name));
        }
        if let Some(git_mail) = &config.git_mail {
            build_args.push(BuildArg::new("GIT_MAIL", git_mail));
        }
        if let Some(password) = &config.password {
            let hasher = self
                .password_hasher
                .as_ref()
                .context("a password is set but no password hasher is available")?;
            build_args.push(BuildArg::new("SUDO_PASS", hasher.hash(password.expose())?));
        }

        let extra_flags: &[&str] = if config.force.update {
            &["--no-cache"]
        } else {
            &[]
        };

        self.container_service
            .engine()
            .build_image(&BuildSpec {
                context: &config.context,
                build_args: &build_args,
                target: &config.setup_image,
                extra_flags,
            })
            .context("error building setup image")
    }

    /// Provisions the build image from the setup image, retrying once
    pub fn setup(&self) -> Result<()> {
        let config = self.config;
        let env = [format!("CID={}", self.commit_id())];
        let spec = RunSpec {
            name: &config.container,
            image: &config.setup_image,
            env: &env,
            mounts: &[],
            script: Some(SETUP_SCRIPT),
        };

        info!("setting up {} from {}...", config.build_image, config.setup_image);

        let attempt = || {
            self.container_service
                .run_and_commit(&spec, &config.build_image, Some(START_SCRIPT))
        };

        match attempt() {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("setup failed ({e:#}), retrying once");
                attempt().context("error setting up build image")
            }
        }
    }

    /// Dependency caching pass over the build image
    pub fn cache(&self) -> Result<()> {
        let config = self.config;
        let env = [format!("CID={}", self.commit_id())];

        info!("caching dependencies in {}...", config.build_image);

        self.container_service
            .run_and_commit(
                &RunSpec {
                    name: &config.container,
                    image: &config.build_image,
                    env: &env,
                    mounts: &[],
                    script: Some(CACHE_SCRIPT),
                },
                &config.build_image,
                Some(START_SCRIPT),
            )
            .context("error caching dependencies")
    }

    /// Compiles inside the build image, with the plugin directory mounted if set
    pub fn build(&self) -> Result<()> {
        let config = self.config;
        let mounts = self.plugin_mounts()?;

        info!("building {}...", config.build_image);

        self.container_service
            .run_and_commit(
                &RunSpec {
                    name: &config.container,
                    image: &config.build_image,
                    env: &[],
                    mounts: &mounts,
                    script: Some(BUILD_SCRIPT),
                },
                &config.build_image,
                Some(START_SCRIPT),
            )
            .context("error building")
    }

    /// Launches a long-lived container, then copies the config files into it
    pub fn deploy(&self, name: &str) -> Result<()> {
        let config = self.config;
        let mounts = self.plugin_mounts()?;
        let env = [format!("START_VPP={}", u8::from(config.running))];

        self.container_service
            .redeploy(&RunSpec {
                name,
                image: &config.build_image,
                env: &env,
                mounts: &mounts,
                script: None,
            })
            .with_context(|| format!("error deploying {name}"))?;

        if self.has_config_files() {
            if let Err(e) = self.configure(name) {
                warn!("{name} is running but was not fully configured: {e:#}");
            }
        }

        info!("{name} deployed");
        Ok(())
    }

    /// Copies the startup and config files into a running container
    pub fn configure(&self, name: &str) -> Result<()> {
        let config = self.config;
        if !self.has_config_files() {
            warn!("no startup or config file set, nothing to copy into {name}");
            return Ok(());
        }

        let files = [
            (config.startup_file.as_deref(), STARTUP_FILE_DEST),
            (config.config_file.as_deref(), CONFIG_FILE_DEST),
        ];

        let mut failed = 0;
        for (path, etc_path) in files {
            let Some(path) = path else { continue };

            if let Err(e) = self.container_service.copy_to_etc(name, path, etc_path) {
                error!("{e:#}");
                failed += 1;
            }
        }

        if failed > 0 {
            bail!("{failed} file(s) could not be copied into {name}");
        }

        Ok(())
    }

    /// Configured commit id, or the one read from git when requested
    pub fn commit_id(&self) -> &str {
        self.commit.get_or_init(|| {
            if let Some(commit) = &self.config.commit {
                return commit.clone();
            }

            let commit = match self.config.commit_source {
                CommitSource::None => return String::new(),
                CommitSource::Current => self.vcs.current_commit(),
                CommitSource::Parent => self.vcs.parent_commit(),
            };

            info!("using commit-id: {commit}");
            commit
        })
    }

    fn has_config_files(&self) -> bool {
        self.config.startup_file.is_some() || self.config.config_file.is_some()
    }

    fn plugin_mounts(&self) -> Result<Vec<BindMount>> {
        self.config
            .plugin
            .as_deref()
            .map(BindMount::plugin)
            .into_iter()
            .collect()
    }
}
