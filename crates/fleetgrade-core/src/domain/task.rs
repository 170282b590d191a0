//! Task stage definitions: external commands and their scheduling policy.

use serde::{Deserialize, Serialize};

/// How a command's process is driven.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Spawn and join before anything else runs.
    Sync,

    /// Spawn without waiting; the caller joins the handle later.
    Background,
}

/// A single external command to run against a repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandSpec {
    /// Shell command text.
    pub text: String,

    /// Sync or background execution.
    pub run_mode: RunMode,

    /// Buffer stdout/stderr as text instead of discarding them.
    pub capture_output: bool,
}

impl CommandSpec {
    /// A synchronous command whose output is discarded.
    pub fn sync(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            run_mode: RunMode::Sync,
            capture_output: false,
        }
    }

    /// A background command whose output is discarded.
    pub fn background(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            run_mode: RunMode::Background,
            capture_output: false,
        }
    }

    /// A synchronous command with captured stdout, as used by checks.
    pub fn captured(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            run_mode: RunMode::Sync,
            capture_output: true,
        }
    }
}

/// An ordered unit of commands run against a repository.
///
/// Stages execute strictly in list order. When `concurrent` is set, every
/// command is launched before any is joined; otherwise each command is fully
/// joined before the next starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStage {
    /// Seconds to pause once, before the stage's commands run.
    pub delay_secs: Option<u64>,

    /// Commands in declaration order.
    pub commands: Vec<CommandSpec>,

    /// Launch all commands before joining any.
    pub concurrent: bool,
}

impl TaskStage {
    /// A sequential stage with no delay.
    pub fn sequential(commands: Vec<CommandSpec>) -> Self {
        Self {
            delay_secs: None,
            commands,
            concurrent: false,
        }
    }

    /// A concurrent stage with no delay.
    pub fn concurrent(commands: Vec<CommandSpec>) -> Self {
        Self {
            delay_secs: None,
            commands,
            concurrent: true,
        }
    }

    /// Set the pre-stage delay.
    pub fn with_delay(mut self, secs: u64) -> Self {
        self.delay_secs = Some(secs);
        self
    }
}
