use anyhow::{Result, bail};
use std::fmt;

/// A container image identified by repository and tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    repository: String,
    tag: String,
}

impl ImageReference {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Result<Self> {
        let repository = repository.into();
        let tag = tag.into();

        if repository.trim().is_empty() {
            bail!("image repository must not be empty");
        }
        if tag.trim().is_empty() {
            bail!("image tag must not be empty (repository '{repository}')");
        }

        Ok(Self { repository, tag })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
