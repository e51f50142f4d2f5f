use crate::domain::{CommitSource, ForceFlags, ImageReference, ToolConfig};
use crate::domain::Password;
use crate::infra::config::{AppConfig, absolute_path, expand_path};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Overrides for everything `vpptool.toml` can set, plus per-run switches
#[derive(Args, Debug, Default, Clone)]
pub struct WorkflowOptions {
    /// Capture engine output instead of streaming it
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Rebuild the setup image from the context even if it exists
    #[arg(long, global = true)]
    pub force_update: bool,

    /// Rerun setup into the build image even if it exists
    #[arg(long, global = true)]
    pub force_setup: bool,

    /// Rerun the dependency cache pass before building
    #[arg(long, global = true)]
    pub force_cache: bool,

    /// Commit id handed to the setup scripts
    #[arg(long, global = true)]
    pub commit_id: Option<String>,

    /// Use the commit id of the current directory's HEAD
    #[arg(long, global = true, conflicts_with = "commit_get_sec")]
    pub commit_get: bool,

    /// Use the commit id of HEAD's parent
    #[arg(long, global = true)]
    pub commit_get_sec: bool,

    /// Build context for the setup image (URL or path)
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Container engine binary
    #[arg(long, global = true)]
    pub engine: Option<String>,

    #[arg(long, global = true)]
    pub setup_image: Option<String>,

    #[arg(long, global = true)]
    pub setup_tag: Option<String>,

    /// Build image repository
    #[arg(long, global = true)]
    pub image: Option<String>,

    /// Build image tag
    #[arg(long, global = true)]
    pub tag: Option<String>,

    #[arg(long, global = true)]
    pub uid: Option<u32>,

    #[arg(long, global = true)]
    pub gid: Option<u32>,

    #[arg(long, global = true)]
    pub git_name: Option<String>,

    #[arg(long, global = true)]
    pub git_mail: Option<String>,

    /// Plugin directory mounted over /opt/vpp/src/plugins/<name>
    #[arg(long, global = true)]
    pub plugin: Option<PathBuf>,

    /// Copied to /etc/vpp/startup.conf of the deployed container
    #[arg(long, global = true)]
    pub startup_file: Option<PathBuf>,

    /// Copied to /etc/vpp/vpp.conf of the deployed container
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Start VPP inside the deployed container
    #[arg(long, global = true)]
    pub running: bool,

    /// Password of the in-image user, stored hashed
    #[arg(long, global = true, env = "VPPTOOL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl WorkflowOptions {
    pub fn commit_source(&self) -> CommitSource {
        if self.commit_get {
            CommitSource::Current
        } else if self.commit_get_sec {
            CommitSource::Parent
        } else {
            CommitSource::None
        }
    }

    pub fn engine(&self, app_config: &AppConfig) -> Result<String> {
        self.engine
            .clone()
            .or_else(|| app_config.engine.clone())
            .context("Container engine not set in config")
    }

    /// Builds the immutable run configuration; flags win over file values
    pub fn resolve(&self, app_config: &AppConfig) -> Result<ToolConfig> {
        let images = &app_config.images;

        let setup_image = ImageReference::new(
            pick(&self.setup_image, &images.setup_image).context("Setup image not set in config")?,
            pick(&self.setup_tag, &images.setup_tag).context("Setup tag not set in config")?,
        )
        .context("invalid setup image")?;

        let build_image = ImageReference::new(
            pick(&self.image, &images.build_image).context("Build image not set in config")?,
            pick(&self.tag, &images.build_tag).context("Build tag not set in config")?,
        )
        .context("invalid build image")?;

        // bind mounts need an absolute host path, or the engine takes a named volume
        let plugin = pick_path(&self.plugin, &app_config.deploy.plugin)
            .map(|path| absolute_path(&path))
            .transpose()
            .context("resolving the plugin directory")?;

        let user = &app_config.user;

        Ok(ToolConfig {
            setup_image,
            build_image,
            context: pick(&self.context, &app_config.build.context)
                .context("Build context not set in config")?,
            container: app_config
                .build
                .container
                .clone()
                .context("Transient container name not set in config")?,
            deploy_name: app_config
                .deploy
                .name
                .clone()
                .context("Deploy name not set in config")?,
            plugin,
            startup_file: pick_path(&self.startup_file, &app_config.deploy.startup_file),
            config_file: pick_path(&self.config_file, &app_config.deploy.config_file),
            commit: self.commit_id.clone().filter(|c| !c.is_empty()),
            commit_source: self.commit_source(),
            uid: self
                .uid
                .or(user.uid)
                .unwrap_or_else(|| nix::unistd::getuid().as_raw()),
            gid: self
                .gid
                .or(user.gid)
                .unwrap_or_else(|| nix::unistd::getgid().as_raw()),
            git_name: pick(&self.git_name, &user.git_name),
            git_mail: pick(&self.git_mail, &user.git_mail),
            password: self
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(Password::new),
            running: self.running || app_config.deploy.running.unwrap_or(false),
            force: ForceFlags {
                update: self.force_update,
                setup: self.force_setup,
                cache: self.force_cache,
            },
        })
    }
}

fn pick(flag: &Option<String>, file: &Option<String>) -> Option<String> {
    flag.clone().or_else(|| file.clone())
}

fn pick_path(flag: &Option<PathBuf>, file: &Option<PathBuf>) -> Option<PathBuf> {
    flag.as_deref().or(file.as_deref()).map(expand_path)
}
