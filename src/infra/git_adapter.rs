use super::runner::{CommandRunner, SystemRunner};
use crate::domain::VersionControl;
use tracing::warn;

/// Reads commit ids through the `git` CLI
#[derive(Debug)]
pub struct GitAdapter<R = SystemRunner> {
    runner: R,
}

impl GitAdapter<SystemRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner::new())
    }
}

impl Default for GitAdapter<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> GitAdapter<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn show(&self, revision: Option<&str>) -> String {
        let mut args = vec![
            "show".to_string(),
            "--pretty=format:\"%H\"".to_string(),
            "--no-patch".to_string(),
        ];
        args.extend(revision.map(str::to_string));

        match self.runner.capture("git", &args) {
            Ok(out) => strip_quotes(out.combined.trim()).to_string(),
            Err(e) => {
                warn!("not in a git repository ({e})");
                String::new()
            }
        }
    }
}

impl<R: CommandRunner> VersionControl for GitAdapter<R> {
    fn current_commit(&self) -> String {
        self.show(None)
    }

    fn parent_commit(&self) -> String {
        self.show(Some("HEAD~1"))
    }
}

/// Drops one leading and one trailing `"` when present
pub fn strip_quotes(raw: &str) -> &str {
    let s = raw.strip_prefix('"').unwrap_or(raw);
    s.strip_suffix('"').unwrap_or(s)
}
