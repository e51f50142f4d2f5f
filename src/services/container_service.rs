use crate::domain::{ContainerEngine, ImageReference, RunSpec};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Exclusive use of a container name: removed on acquire and again on drop
pub struct ContainerLease<'a> {
    engine: &'a dyn ContainerEngine,
    name: &'a str,
}

impl<'a> ContainerLease<'a> {
    pub fn acquire(engine: &'a dyn ContainerEngine, name: &'a str) -> Result<Self> {
        engine
            .remove_container(name)
            .with_context(|| format!("clearing container {name}"))?;

        Ok(Self { engine, name })
    }

    pub fn name(&self) -> &str {
        self.name
    }
}

impl Drop for ContainerLease<'_> {
    fn drop(&mut self) {
        match self.engine.remove_container(self.name) {
            Ok(()) => debug!("released container {}", self.name),
            Err(e) => warn!("could not release container {}: {e:#}", self.name),
        }
    }
}

pub struct ContainerService {
    engine: Arc<dyn ContainerEngine>,
}

impl ContainerService {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &dyn ContainerEngine {
        self.engine.as_ref()
    }

    pub fn image_exists(&self, image: &ImageReference) -> bool {
        self.engine.image_exists(image)
    }

    pub fn lease<'a>(&'a self, name: &'a str) -> Result<ContainerLease<'a>> {
        ContainerLease::acquire(self.engine.as_ref(), name)
    }

    /// Runs `spec` in a leased container and snapshots the result into `target`
    pub fn run_and_commit(
        &self,
        spec: &RunSpec,
        target: &ImageReference,
        entrypoint: Option<&str>,
    ) -> Result<()> {
        let lease = self.lease(spec.name)?;

        self.engine.run_named(spec)?;
        self.engine.commit(lease.name(), target, entrypoint)
    }

    /// Replaces whatever runs under `spec.name` with a fresh detached instance
    pub fn redeploy(&self, spec: &RunSpec) -> Result<()> {
        self.engine.remove_container(spec.name)?;
        info!("launching {} from {}", spec.name, spec.image);
        self.engine.run_detached_privileged(spec)
    }

    pub fn copy_to_etc(&self, name: &str, host_path: &Path, etc_path: &str) -> Result<()> {
        info!("copying {:?} to {name}:/etc/{etc_path}", host_path);
        self.engine.copy_to_container_etc(name, host_path, etc_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;

    fn image() -> ImageReference {
        ImageReference::new("vpptool-images", "build").unwrap()
    }

    #[test]
    fn lease_removes_on_acquire_and_drop() {
        let mock = MockEngine::new();
        {
            let lease = ContainerLease::acquire(&mock, "tmp").unwrap();
            assert_eq!(lease.name(), "tmp");
            assert_eq!(mock.get_commands(), vec!["remove:tmp"]);
        }
        assert_eq!(mock.get_commands(), vec!["remove:tmp", "remove:tmp"]);
    }

    #[test]
    fn run_and_commit_releases_after_success() {
        let mock = Arc::new(MockEngine::new());
        let service = ContainerService::new(mock.clone());
        let img = image();

        service
            .run_and_commit(
                &RunSpec {
                    name: "tmp",
                    image: &img,
                    env: &[],
                    mounts: &[],
                    script: Some("/scripts/build"),
                },
                &img,
                Some("/scripts/start"),
            )
            .unwrap();

        assert_eq!(
            mock.get_commands(),
            vec![
                "remove:tmp",
                "run:tmp:vpptool-images:build",
                "commit:tmp:vpptool-images:build",
                "remove:tmp",
            ]
        );
    }

    #[test]
    fn run_and_commit_releases_after_failure() {
        let mock = Arc::new(MockEngine::new());
        mock.set_fail_on("run");
        let service = ContainerService::new(mock.clone());
        let img = image();

        let result = service.run_and_commit(
            &RunSpec {
                name: "tmp",
                image: &img,
                env: &[],
                mounts: &[],
                script: None,
            },
            &img,
            None,
        );

        assert!(result.is_err());
        assert_eq!(
            mock.get_commands(),
            vec!["remove:tmp", "run:tmp:vpptool-images:build", "remove:tmp"]
        );
    }

    #[test]
    fn redeploy_removes_before_launch() {
        let mock = Arc::new(MockEngine::new());
        let service = ContainerService::new(mock.clone());
        let img = image();

        service
            .redeploy(&RunSpec {
                name: "vpp-run",
                image: &img,
                env: &[],
                mounts: &[],
                script: None,
            })
            .unwrap();

        assert_eq!(
            mock.get_commands(),
            vec!["remove:vpp-run", "deploy:vpp-run:vpptool-images:build"]
        );
    }
}
