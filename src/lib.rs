pub mod cli;
pub mod domain;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{ContainerEngine, ImageReference, ToolConfig, VersionControl};
pub use infra::{DockerAdapter, GitAdapter};
pub use services::{ContainerService, Orchestrator, Stage};
