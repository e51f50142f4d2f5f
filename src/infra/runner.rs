use std::fmt::Debug;
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Output, Stdio};
use thiserror::Error;
use tracing::debug;

/// Output of a process that exited with status 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// stdout followed by stderr
    pub combined: String,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("could not execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} {}", describe_exit(.code))]
    Exit {
        program: String,
        /// `None` when the process was terminated by a signal
        code: Option<i32>,
        output: String,
    },
}

impl ProcessError {
    /// Output captured before the failure, empty in passthrough mode
    pub fn output(&self) -> &str {
        match self {
            Self::Spawn { .. } => "",
            Self::Exit { output, .. } => output,
        }
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Spawn { .. } => None,
            Self::Exit { code, .. } => *code,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// Runs external programs on behalf of the adapters
pub trait CommandRunner: Send + Sync + Debug {
    /// Run with stdout/stderr captured into one string
    fn capture(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProcessError>;

    /// Like `capture`, with `input` written to the child's stdin
    fn capture_with_input(
        &self,
        program: &str,
        args: &[String],
        input: &str,
    ) -> Result<CommandOutput, ProcessError>;

    /// Run with the child attached to the invoking terminal
    fn passthrough(&self, program: &str, args: &[String]) -> Result<(), ProcessError>;
}

/// Runner backed by `std::process::Command` in the current working directory
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn capture(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProcessError> {
        debug!("running (captured): {}", command_line(program, args));

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| spawn_error(program, source))?;

        collect_output(program, output)
    }

    fn capture_with_input(
        &self,
        program: &str,
        args: &[String],
        input: &str,
    ) -> Result<CommandOutput, ProcessError> {
        debug!("running (captured, stdin): {}", command_line(program, args));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| spawn_error(program, source))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|source| spawn_error(program, source))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|source| spawn_error(program, source))?;

        collect_output(program, output)
    }

    fn passthrough(&self, program: &str, args: &[String]) -> Result<(), ProcessError> {
        debug!("running: {}", command_line(program, args));

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| spawn_error(program, source))?;

        ensure_success(program, status)
    }
}

/// stdout followed by stderr; success iff the exit status is 0
fn collect_output(program: &str, output: Output) -> Result<CommandOutput, ProcessError> {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        return Ok(CommandOutput { combined });
    }

    debug!("{} failed ({:?}):\n{}", program, output.status, combined);

    Err(ProcessError::Exit {
        program: program.to_string(),
        code: output.status.code(),
        output: combined,
    })
}

fn spawn_error(program: &str, source: io::Error) -> ProcessError {
    debug!("could not spawn {program}: {source}");
    ProcessError::Spawn {
        program: program.to_string(),
        source,
    }
}

fn ensure_success(program: &str, status: ExitStatus) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }

    Err(ProcessError::Exit {
        program: program.to_string(),
        code: status.code(),
        output: String::new(),
    })
}

/// Human readable command line for logs
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn captures_combined_output_on_success() {
        let runner = SystemRunner::new();
        let out = runner
            .capture("sh", &args(&["-c", "echo out; echo err >&2"]))
            .unwrap();
        assert_eq!(out.combined, "out\nerr\n");
    }

    #[test]
    fn non_zero_exit_keeps_code_and_output() {
        let runner = SystemRunner::new();
        let err = runner
            .capture("sh", &args(&["-c", "echo boom; exit 3"]))
            .unwrap_err();
        assert_eq!(err.code(), Some(3));
        assert_eq!(err.output(), "boom\n");
        assert!(err.to_string().contains("exited with status 3"));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let runner = SystemRunner::new();
        let err = runner
            .capture("vpptool-definitely-not-a-binary", &[])
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert_eq!(err.output(), "");
    }

    #[test]
    fn feeds_input_to_stdin() {
        let runner = SystemRunner::new();
        let out = runner
            .capture_with_input("sh", &args(&["-c", "read line; echo got:$line"]), "hunter2\n")
            .unwrap();
        assert_eq!(out.combined, "got:hunter2\n");
    }

    #[test]
    fn passthrough_reports_status() {
        let runner = SystemRunner::new();
        assert!(runner.passthrough("true", &[]).is_ok());
        assert_eq!(runner.passthrough("false", &[]).unwrap_err().code(), Some(1));
    }

    #[test]
    fn command_line_joins_arguments() {
        assert_eq!(
            command_line("docker", &args(&["rm", "-f", "vpp-run"])),
            "docker rm -f vpp-run"
        );
    }
}
