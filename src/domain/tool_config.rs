use super::ImageReference;
use std::fmt;
use std::path::PathBuf;

/// Where the commit id handed to the setup scripts comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitSource {
    /// Only an explicitly configured id is used
    #[default]
    None,
    /// HEAD of the working directory
    Current,
    /// HEAD's parent
    Parent,
}

/// Flags that rebuild an image even when it already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForceFlags {
    /// Rebuild the setup image from the context
    pub update: bool,
    /// Rerun setup into the build image
    pub setup: bool,
    /// Rerun the dependency cache pass
    pub cache: bool,
}

/// Plain password of the in-image user, redacted in debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(plain: impl Into<String>) -> Self {
        Self(plain.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Everything one invocation needs, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub setup_image: ImageReference,
    pub build_image: ImageReference,
    pub context: String,
    /// Transient container used during setup, cache and build
    pub container: String,
    pub deploy_name: String,
    pub plugin: Option<PathBuf>,
    pub startup_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub commit: Option<String>,
    pub commit_source: CommitSource,
    pub uid: u32,
    pub gid: u32,
    pub git_name: Option<String>,
    pub git_mail: Option<String>,
    /// Hashed only when the setup image is built
    pub password: Option<Password>,
    pub running: bool,
    pub force: ForceFlags,
}
