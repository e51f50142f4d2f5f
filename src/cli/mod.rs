pub mod options;
pub mod workflow;

pub use options::WorkflowOptions;

use crate::infra::config::default_config_dir;
use crate::services::Stage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vpptool",
    version,
    about = "Builds, caches and deploys VPP development containers"
)]
pub struct Cli {
    /// Config directory (default: ~/.config/vpptool)
    #[arg(long, global = true, env = "VPPTOOL_CONFIG_DIR", default_value_os_t = default_config_dir())]
    pub config_dir: PathBuf,

    /// Verbose logging, including captured engine output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(flatten)]
    pub options: WorkflowOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Build the setup image from the context
    Install,
    /// Provision the build image from the setup image
    Setup,
    /// Run the dependency cache pass on the build image
    Cache,
    /// Compile inside the build image
    Build,
    /// (Re)launch a privileged, host-networked container from the build image
    Deploy {
        /// Container name (default: vpp-run)
        name: Option<String>,
    },
    /// Copy startup/config files into a running container
    Configure {
        /// Container name (default: vpp-run)
        name: Option<String>,
    },
}

impl Commands {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Install => Stage::Install,
            Self::Setup => Stage::Setup,
            Self::Cache => Stage::Cache,
            Self::Build => Stage::Build,
            Self::Deploy { .. } => Stage::Deploy,
            Self::Configure { .. } => Stage::Configure,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Deploy { name } | Self::Configure { name } => name.as_deref(),
            _ => None,
        }
    }
}
