use super::ImageReference;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory inside the images where VPP looks for out-of-tree plugins
pub const PLUGIN_DIR: &str = "/opt/vpp/src/plugins";

/// Host path mounted into a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub host: PathBuf,
    pub container: String,
}

impl BindMount {
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
        }
    }

    /// Mounts a plugin directory over `PLUGIN_DIR/<last path segment>`
    pub fn plugin(host: &Path) -> Result<Self> {
        let name = host
            .file_name()
            .with_context(|| format!("plugin path {:?} has no final segment", host))?
            .to_string_lossy()
            .into_owned();

        Ok(Self::new(host, format!("{PLUGIN_DIR}/{name}")))
    }
}

impl fmt::Display for BindMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container)
    }
}

/// Key/value pair passed to the engine as `--build-arg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArg {
    pub key: String,
    pub value: String,
}

impl BuildArg {
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for BuildArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone)]
pub struct BuildSpec<'a> {
    /// URL or local path handed to the engine as build context
    pub context: &'a str,
    pub build_args: &'a [BuildArg],
    pub target: &'a ImageReference,
    pub extra_flags: &'a [&'a str],
}

#[derive(Debug, Clone)]
pub struct RunSpec<'a> {
    pub name: &'a str,
    pub image: &'a ImageReference,
    /// `KEY=value` entries
    pub env: &'a [String],
    pub mounts: &'a [BindMount],
    /// In-image script overriding the default command
    pub script: Option<&'a str>,
}
