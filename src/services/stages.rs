use crate::domain::ForceFlags;
use std::fmt;

pub const SETUP_SCRIPT: &str = "/scripts/setup";
pub const CACHE_SCRIPT: &str = "/scripts/cache";
pub const BUILD_SCRIPT: &str = "/scripts/build";
/// Default command of the built image
pub const START_SCRIPT: &str = "/scripts/start";

/// Destinations relative to `/etc` in the deployed container
pub const STARTUP_FILE_DEST: &str = "vpp/startup.conf";
pub const CONFIG_FILE_DEST: &str = "vpp/vpp.conf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Install,
    Setup,
    Cache,
    Build,
    Deploy,
    Configure,
}

impl Stage {
    /// `STAGES` is ordered like the enum
    pub fn definition(self) -> &'static StageDefinition {
        &STAGES[self as usize]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Setup => "setup",
            Self::Cache => "cache",
            Self::Build => "build",
            Self::Deploy => "deploy",
            Self::Configure => "configure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Setup,
    Build,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceFlag {
    Update,
    Setup,
    Cache,
}

impl ForceFlag {
    pub fn is_set(self, flags: &ForceFlags) -> bool {
        match self {
            Self::Update => flags.update,
            Self::Setup => flags.setup,
            Self::Cache => flags.cache,
        }
    }
}

/// An image a stage depends on, and how to get it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prerequisite {
    pub image: ImageKind,
    pub producer: Stage,
    pub force: ForceFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDefinition {
    pub stage: Stage,
    /// Checked in order before the stage runs
    pub prerequisites: &'static [Prerequisite],
    /// Image written when the stage succeeds
    pub produces: Option<ImageKind>,
    /// Operates on a named, long-lived container
    pub takes_name: bool,
}

const SETUP_IMAGE_FROM_INSTALL: Prerequisite = Prerequisite {
    image: ImageKind::Setup,
    producer: Stage::Install,
    force: ForceFlag::Update,
};

const BUILD_IMAGE_FROM_SETUP: Prerequisite = Prerequisite {
    image: ImageKind::Build,
    producer: Stage::Setup,
    force: ForceFlag::Setup,
};

const BUILD_IMAGE_FROM_CACHE: Prerequisite = Prerequisite {
    image: ImageKind::Build,
    producer: Stage::Cache,
    force: ForceFlag::Cache,
};

pub const STAGES: &[StageDefinition] = &[
    StageDefinition {
        stage: Stage::Install,
        prerequisites: &[],
        produces: Some(ImageKind::Setup),
        takes_name: false,
    },
    StageDefinition {
        stage: Stage::Setup,
        prerequisites: &[SETUP_IMAGE_FROM_INSTALL],
        produces: Some(ImageKind::Build),
        takes_name: false,
    },
    StageDefinition {
        stage: Stage::Cache,
        prerequisites: &[BUILD_IMAGE_FROM_SETUP],
        produces: Some(ImageKind::Build),
        takes_name: false,
    },
    StageDefinition {
        stage: Stage::Build,
        prerequisites: &[BUILD_IMAGE_FROM_SETUP, BUILD_IMAGE_FROM_CACHE],
        produces: Some(ImageKind::Build),
        takes_name: false,
    },
    StageDefinition {
        stage: Stage::Deploy,
        prerequisites: &[],
        produces: None,
        takes_name: true,
    },
    StageDefinition {
        stage: Stage::Configure,
        prerequisites: &[],
        produces: None,
        takes_name: true,
    },
];

pub fn needs_rebuild(image_exists: bool, forced: bool) -> bool {
    !image_exists || forced
}
