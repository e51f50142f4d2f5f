use super::WorkflowOptions;
use crate::infra::config::load_app_config;
use crate::infra::{DockerAdapter, GitAdapter, OpensslHasher};
use crate::services::{ContainerService, Orchestrator, Stage};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub fn run(
    stage: Stage,
    name: Option<&str>,
    options: &WorkflowOptions,
    config_dir: &Path,
) -> Result<()> {
    let app_config = load_app_config(config_dir)?;
    let config = options.resolve(&app_config)?;
    let engine_bin = options.engine(&app_config)?;

    debug!("resolved configuration: {:?}", config);

    let engine = Arc::new(DockerAdapter::new(engine_bin, options.quiet));
    let container_service = Arc::new(ContainerService::new(engine));
    let vcs = Arc::new(GitAdapter::new());

    Orchestrator::new(&config, container_service, vcs)
        .with_password_hasher(Arc::new(OpensslHasher::new()))
        .run(stage, name)
}
