use super::runner::{CommandRunner, SystemRunner};
use crate::domain::PasswordHasher;
use anyhow::{Context, Result, bail};

/// Hashes a password into a crypt(3) SHA-512 string with `openssl passwd -6`.
/// The password goes through stdin so it never shows up in the process list.
pub fn hash_password<R: CommandRunner + ?Sized>(runner: &R, plain: &str) -> Result<String> {
    let args = vec!["passwd".to_string(), "-6".to_string(), "-stdin".to_string()];

    let out = runner
        .capture_with_input("openssl", &args, &format!("{plain}\n"))
        .context("hashing password with openssl")?;

    let hash = out.combined.trim();
    if !hash.starts_with("$6$") {
        bail!("openssl returned an unexpected password hash");
    }

    Ok(hash.to_string())
}

#[derive(Debug)]
pub struct OpensslHasher<R = SystemRunner> {
    runner: R,
}

impl OpensslHasher<SystemRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner::new())
    }
}

impl Default for OpensslHasher<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> OpensslHasher<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: CommandRunner> PasswordHasher for OpensslHasher<R> {
    fn hash(&self, plain: &str) -> Result<String> {
        hash_password(&self.runner, plain)
    }
}
