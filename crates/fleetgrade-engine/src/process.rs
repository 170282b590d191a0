//! External process execution with explicit join handles.

use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::info;

use fleetgrade_core::{FleetError, Result};

/// Captured result of a joined process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Exit code (-1 when terminated by signal).
    pub exit_code: i32,

    /// Captured stdout; empty unless capture was requested.
    pub stdout: String,

    /// Captured stderr; empty unless capture was requested.
    pub stderr: String,
}

impl RunOutput {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawn-time options for a single command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnOptions {
    /// Buffer stdout/stderr as text instead of discarding them.
    pub capture: bool,

    /// Pass the whole command string to `sh -c` instead of tokenizing it
    /// into an argument vector on whitespace.
    pub use_shell: bool,

    /// Annotate the log line with a trailing background marker.
    pub background: bool,
}

impl SpawnOptions {
    /// Options for a user-supplied shell command with discarded output.
    pub fn shell() -> Self {
        Self {
            use_shell: true,
            ..Self::default()
        }
    }

    /// Options for a check command: shell execution with captured stdout.
    pub fn shell_captured() -> Self {
        Self {
            capture: true,
            use_shell: true,
            background: false,
        }
    }
}

/// A spawned process that must be joined before its output or exit status
/// can be relied on. Joining consumes the handle; cancellation is not
/// supported.
pub struct ProcessHandle {
    child: Child,
    command: String,
}

impl ProcessHandle {
    /// Wait for the process to finish and collect its output.
    pub async fn join(self) -> Result<RunOutput> {
        let output = self
            .child
            .wait_with_output()
            .await
            .map_err(|e| FleetError::Process(format!("failed to join `{}`: {e}", self.command)))?;

        Ok(RunOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Uniform launcher for every external command in a grading run.
///
/// The runner never treats a nonzero exit as an error; callers decide.
/// Output is either captured or discarded, never inherited, so many
/// repositories' commands cannot interleave on the parent's descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    /// Suppress the per-command informational log line.
    pub quiet: bool,
}

impl ProcessRunner {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Spawn a command in `cwd` and return its handle without waiting.
    ///
    /// The log line carries the command text, the target label, and a
    /// trailing ` &` marker for background spawns; it is a side effect
    /// only and never affects control flow.
    pub fn spawn(
        &self,
        command: &str,
        cwd: &Path,
        label: &str,
        opts: SpawnOptions,
    ) -> Result<ProcessHandle> {
        if !self.quiet {
            let marker = if opts.background { " &" } else { "" };
            info!(repo = %label, "{command}{marker}");
        }

        let mut cmd = if opts.use_shell {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        } else {
            let mut parts = command.split_whitespace();
            let exe = parts
                .next()
                .ok_or_else(|| FleetError::Process("empty command".to_string()))?;
            let mut cmd = Command::new(exe);
            cmd.args(parts);
            cmd
        };

        let io = || {
            if opts.capture {
                Stdio::piped()
            } else {
                Stdio::null()
            }
        };
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(io())
            .stderr(io());

        let child = cmd
            .spawn()
            .map_err(|e| FleetError::Process(format!("failed to spawn `{command}`: {e}")))?;

        Ok(ProcessHandle {
            child,
            command: command.to_string(),
        })
    }

    /// Spawn a command and join it immediately.
    pub async fn run(
        &self,
        command: &str,
        cwd: &Path,
        label: &str,
        opts: SpawnOptions,
    ) -> Result<RunOutput> {
        self.spawn(command, cwd, label, opts)?.join().await
    }
}
