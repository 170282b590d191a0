//! Concurrent clone-or-fetch barrier for the repository fleet.
//!
//! Every repository is synchronized concurrently and the whole batch is
//! jointly awaited before any checkout proceeds. Unlike prepare/task/check
//! commands, a failing sync command aborts the entire run.

use std::path::Path;

use futures::future::join_all;
use tracing::info;

use fleetgrade_core::{git, FleetError, RepoSet, Repository, Result};

use crate::discovery::{ForkSource, RemoteRepo};
use crate::process::{ProcessHandle, ProcessRunner, SpawnOptions};

/// Discover the fleet from `source` and synchronize it under `dest_root`.
///
/// The origin repository is always part of the fleet, listed before its
/// forks.
pub async fn discover_and_sync(
    source: &dyn ForkSource,
    runner: &ProcessRunner,
    dest_root: &Path,
) -> Result<RepoSet> {
    let mut remotes = vec![source.origin().await?];
    remotes.extend(source.list_forks().await?);
    info!(repos = remotes.len(), "fleet discovered");
    sync_all(runner, &remotes, dest_root).await
}

/// Clone or fetch every remote concurrently, then await the whole batch.
///
/// A repository that already has a work tree under `dest_root` is fetched
/// in place; anything else is cloned fresh. Any nonzero exit is fatal and
/// no repository set is produced.
pub async fn sync_all(
    runner: &ProcessRunner,
    remotes: &[RemoteRepo],
    dest_root: &Path,
) -> Result<RepoSet> {
    std::fs::create_dir_all(dest_root)?;

    let opts = SpawnOptions {
        capture: true,
        use_shell: false,
        background: true,
    };

    let mut handles = Vec::with_capacity(remotes.len());
    let mut planned = Vec::with_capacity(remotes.len());
    for remote in remotes {
        let dest = dest_root.join(&remote.name);
        let handle = if dest.exists() {
            if !git::is_git_repo(&dest) {
                return Err(FleetError::Sync(format!(
                    "{} exists but is not a git work tree",
                    dest.display()
                )));
            }
            runner.spawn("git fetch --all --tags", &dest, &remote.name, opts)?
        } else {
            let command = format!("git clone {} {}", remote.clone_url, remote.name);
            runner.spawn(&command, dest_root, &remote.name, opts)?
        };
        handles.push(handle);
        planned.push(Repository::new(remote.name.clone(), dest));
    }

    // The barrier: every sync command joined before any checkout starts.
    let outputs = join_all(handles.into_iter().map(ProcessHandle::join)).await;

    let mut set = RepoSet::new();
    for (repo, output) in planned.into_iter().zip(outputs) {
        let output = output?;
        if !output.success() {
            return Err(FleetError::Sync(format!(
                "sync of {} exited with {}: {}",
                repo.name,
                output.exit_code,
                output.stderr.trim()
            )));
        }
        set.insert(repo)?;
    }

    info!(repos = set.len(), root = %dest_root.display(), "fleet synchronized");
    Ok(set)
}
