//! Git query layer for grading: tags, checkout, reset, and commit dates.
//!
//! Every operation takes the repository's working directory as an explicit
//! parameter; nothing here relies on the process-wide current directory.

use std::path::Path;
use std::process::Command;

use crate::domain::error::{FleetError, Result};

fn git_output(repo_dir: &Path, args: &[&str]) -> Result<std::process::Output> {
    Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| FleetError::Git(format!("failed to run git: {e}")))
}

fn git_expect(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = git_output(repo_dir, args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FleetError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// List all tag names in the repository.
///
/// Callers treat a failure as "no tags available" rather than fatal.
pub fn list_tags(repo_dir: &Path) -> Result<Vec<String>> {
    let stdout = git_expect(repo_dir, &["tag", "--list"])?;
    Ok(stdout.lines().map(str::to_string).collect())
}

/// Name of the currently checked-out branch.
pub fn current_branch(repo_dir: &Path) -> Result<String> {
    let stdout = git_expect(repo_dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = stdout.trim().to_string();
    if branch.is_empty() {
        return Err(FleetError::Git(
            "git rev-parse returned empty branch name".to_string(),
        ));
    }
    Ok(branch)
}

/// Check out a ref (tag or branch).
pub fn checkout_ref(repo_dir: &Path, reference: &str) -> Result<()> {
    git_expect(repo_dir, &["checkout", "--quiet", reference]).map(|_| ())
}

/// Hard-reset the work tree and remove untracked files and directories.
/// Destructive and irreversible within the run.
pub fn hard_reset(repo_dir: &Path) -> Result<()> {
    git_expect(repo_dir, &["reset", "--hard", "--quiet"])?;
    git_expect(repo_dir, &["clean", "-fd", "--quiet"]).map(|_| ())
}

/// Timestamp of the most recent commit on the checked-out ref, formatted
/// with `format`, which is passed through to git verbatim.
pub fn last_commit_date(repo_dir: &Path, format: &str) -> Result<String> {
    let date_arg = format!("--date=format:{format}");
    let stdout = git_expect(repo_dir, &["log", "-1", "--format=%cd", &date_arg])?;
    Ok(stdout.trim().to_string())
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
