pub mod config;
pub mod docker_adapter;
pub mod git_adapter;
pub mod password;
pub mod runner;

pub use docker_adapter::DockerAdapter;
pub use git_adapter::GitAdapter;
pub use password::OpensslHasher;
pub use runner::{CommandOutput, CommandRunner, ProcessError, SystemRunner};
