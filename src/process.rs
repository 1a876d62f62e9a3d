//! Subprocess execution.
//!
//! Git, the coding agent and test tools are all treated as opaque commands
//! keyed by exit status and captured streams. Everything goes through the
//! `CommandRunner` trait so the pipeline can be driven by a scripted fake
//! in tests.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one finished command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program args...` in `cwd` to completion, capturing both streams.
    ///
    /// Errors only when the process cannot be spawned; a non-zero exit is a
    /// normal `CommandOutput`.
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput>;

    /// Whether `program` resolves to an executable on `PATH`.
    fn has_program(&self, program: &str) -> bool {
        program_on_path(program)
    }
}

/// Real implementation backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput> {
        debug!(program, ?args, cwd = %cwd.display(), "spawning command");
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", program))?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(program, exit_code, "command finished");
        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Scan `PATH` for `program`. Paths containing a separator are checked directly.
pub fn program_on_path(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return true;
        }
        cfg!(windows) && ["exe", "cmd", "bat"].iter().any(|ext| candidate.with_extension(ext).is_file())
    })
}

/// Convenience for building owned argument lists.
pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
