use super::{BuildSpec, ImageReference, RunSpec};
use anyhow::Result;
use std::fmt::Debug;
use std::path::Path;

/// Trait for container engine operations
pub trait ContainerEngine: Send + Sync + Debug {
    /// Check whether an image is present in the local store
    fn image_exists(&self, image: &ImageReference) -> bool;

    /// Force-remove a container; a missing container is not an error
    fn remove_container(&self, name: &str) -> Result<()>;

    /// Build an image from a context
    fn build_image(&self, spec: &BuildSpec) -> Result<()>;

    /// Run a named container in the foreground until it exits
    fn run_named(&self, spec: &RunSpec) -> Result<()>;

    /// Launch a detached, privileged, host-networked container
    fn run_detached_privileged(&self, spec: &RunSpec) -> Result<()>;

    /// Snapshot a container into an image, optionally replacing its command
    fn commit(&self, name: &str, image: &ImageReference, entrypoint: Option<&str>) -> Result<()>;

    /// Copy a host file to `/etc/<etc_path>` inside a container.
    /// `etc_path` may name a file in a subdirectory such as `vpp/startup.conf`.
    fn copy_to_container_etc(&self, name: &str, host_path: &Path, etc_path: &str) -> Result<()>;
}

/// Read access to commit metadata of the working directory
pub trait VersionControl: Send + Sync + Debug {
    /// Commit id of HEAD, empty when unavailable
    fn current_commit(&self) -> String;

    /// Commit id of HEAD's parent, empty when unavailable
    fn parent_commit(&self) -> String;
}

/// Turns a plain password into the crypt(3) string the image expects
pub trait PasswordHasher: Send + Sync + Debug {
    fn hash(&self, plain: &str) -> Result<String>;
}
