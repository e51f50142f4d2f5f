mod container_service;
mod orchestrator;
pub mod stages;

pub use container_service::{ContainerLease, ContainerService};
pub use orchestrator::Orchestrator;
pub use stages::{STAGES, Stage, StageDefinition};
