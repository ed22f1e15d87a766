//! Process execution utilities
//!
//! Provides a unified interface for running external commands with:
//! - Output capture
//! - Environment variables scoped to the child process
//! - PATH lookup

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// Result of a command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code of the command
    pub exit_code: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandResult {
    /// Create from std::process::Output
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Run a command and capture output
pub fn run_command<S: AsRef<OsStr>>(program: impl AsRef<OsStr>, args: &[S]) -> Result<CommandResult> {
    run_command_with_env(program, args, &[])
}

/// Run a command with extra environment variables set only for the child
///
/// The current process environment is never modified.
pub fn run_command_with_env<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    env: &[(&str, &str)],
) -> Result<CommandResult> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (key, value) in env {
        cmd.env(key, value);
    }

    tracing::debug!(program = %program.to_string_lossy(), "Running command");

    let output = cmd.output().map_err(|e| {
        Error::process(format!(
            "Failed to execute {}: {}",
            program.to_string_lossy(),
            e
        ))
        .with_source(e)
    })?;

    Ok(CommandResult::from_output(output))
}

/// Check if a command exists in PATH
pub fn command_exists(program: &str) -> bool {
    which_command(program).is_some()
}

/// Get the path to a command
pub fn which_command(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}
