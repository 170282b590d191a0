//! Ordered task-stage execution per repository.
//!
//! Task commands are build/test side effects whose success is observed by
//! the rule checks afterwards, so failures here are logged and absorbed,
//! never propagated.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use fleetgrade_core::{Repository, TaskStage};

use crate::process::{ProcessHandle, ProcessRunner, RunOutput, SpawnOptions};

/// Run every task stage against one repository, strictly in list order.
///
/// A stage's optional delay is applied exactly once, before its commands.
/// Sequential stages join each command before launching the next and do not
/// short-circuit on failure; concurrent stages launch every command first
/// and only complete once all of them are joined.
pub async fn run_stages(runner: &ProcessRunner, repo: &Repository, stages: &[TaskStage]) {
    for stage in stages {
        if let Some(secs) = stage.delay_secs {
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }

        if stage.concurrent {
            let mut handles = Vec::with_capacity(stage.commands.len());
            for command in &stage.commands {
                let opts = SpawnOptions {
                    capture: command.capture_output,
                    use_shell: true,
                    background: true,
                };
                match runner.spawn(&command.text, &repo.location, &repo.name, opts) {
                    Ok(handle) => handles.push(handle),
                    Err(e) => warn!(repo = %repo.name, "task spawn failed: {e}"),
                }
            }
            for joined in join_all(handles.into_iter().map(ProcessHandle::join)).await {
                observe(&repo.name, joined);
            }
        } else {
            for command in &stage.commands {
                let opts = SpawnOptions {
                    capture: command.capture_output,
                    use_shell: true,
                    background: false,
                };
                let joined = runner
                    .run(&command.text, &repo.location, &repo.name, opts)
                    .await;
                observe(&repo.name, joined);
            }
        }
    }
}

fn observe(repo: &str, joined: fleetgrade_core::Result<RunOutput>) {
    match joined {
        Ok(output) if !output.success() => {
            debug!(repo = %repo, "task command exited with {}", output.exit_code);
        }
        Err(e) => warn!(repo = %repo, "task command failed: {e}"),
        Ok(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgrade_core::CommandSpec;

    fn temp_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::new("fork-a", dir.path());
        (dir, repo)
    }

    #[tokio::test]
    async fn sequential_stage_orders_commands() {
        let (dir, repo) = temp_repo();

        // The first command finishes late; sequential execution still puts
        // its line first.
        let stage = TaskStage::sequential(vec![
            CommandSpec::sync("sleep 0.2 && echo first >> order.txt"),
            CommandSpec::sync("echo second >> order.txt"),
        ]);

        run_stages(&ProcessRunner::new(true), &repo, &[stage]).await;

        let order = std::fs::read_to_string(dir.path().join("order.txt")).unwrap();
        assert_eq!(order, "first\nsecond\n");
    }

    #[tokio::test]
    async fn sequential_stage_does_not_short_circuit() {
        let (dir, repo) = temp_repo();

        let stage = TaskStage::sequential(vec![
            CommandSpec::sync("exit 3"),
            CommandSpec::sync("touch survived.txt"),
        ]);

        run_stages(&ProcessRunner::new(true), &repo, &[stage]).await;
        assert!(dir.path().join("survived.txt").exists());
    }

    #[tokio::test]
    async fn concurrent_stage_joins_every_command() {
        let (dir, repo) = temp_repo();

        let stage = TaskStage::concurrent(vec![
            CommandSpec::background("sleep 0.2 && touch slow.txt"),
            CommandSpec::background("touch fast.txt"),
        ]);

        run_stages(&ProcessRunner::new(true), &repo, &[stage]).await;

        // run_stages only returns once both are joined.
        assert!(dir.path().join("slow.txt").exists());
        assert!(dir.path().join("fast.txt").exists());
    }

    #[tokio::test]
    async fn stages_run_in_list_order() {
        let (dir, repo) = temp_repo();

        let stages = vec![
            TaskStage::sequential(vec![CommandSpec::sync("echo one >> stages.txt")]),
            TaskStage::sequential(vec![CommandSpec::sync("echo two >> stages.txt")]),
        ];

        run_stages(&ProcessRunner::new(true), &repo, &stages).await;

        let content = std::fs::read_to_string(dir.path().join("stages.txt")).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[tokio::test]
    async fn delay_applies_once_per_stage() {
        let (_dir, repo) = temp_repo();

        let stage = TaskStage::sequential(vec![
            CommandSpec::sync("true"),
            CommandSpec::sync("true"),
        ])
        .with_delay(1);

        let start = std::time::Instant::now();
        run_stages(&ProcessRunner::new(true), &repo, &[stage]).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_secs(1));
        // Two commands after a single one-second delay, not one each.
        assert!(elapsed < Duration::from_secs(2));
    }
}
