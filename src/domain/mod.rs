mod container;
mod image;
mod tool_config;
pub mod traits;

pub use container::{BindMount, BuildArg, BuildSpec, PLUGIN_DIR, RunSpec};
pub use image::ImageReference;
pub use tool_config::{CommitSource, ForceFlags, Password, ToolConfig};
pub use traits::{ContainerEngine, PasswordHasher, VersionControl};
