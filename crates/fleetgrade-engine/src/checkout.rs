//! Checkout stage: ranked-tag selection, reset, commit date, preparation.

use tracing::warn;

use fleetgrade_core::{git, Repository, Result};

use crate::process::{ProcessRunner, SpawnOptions};

/// Checkout-stage policy shared by every repository in a run.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutPolicy<'a> {
    /// Acceptable tags in priority order; the earliest entry present in the
    /// repository wins, regardless of tag dates.
    pub ranked_tags: &'a [String],

    /// Hard-reset the work tree and remove untracked files before grading.
    pub reset: bool,

    /// Date format token passed verbatim to the revision-history query.
    pub date_format: &'a str,

    /// Commands run sequentially after checkout, in declaration order.
    pub prepare_commands: &'a [String],

    /// Whether to run the prepare commands at all (skipped when task
    /// stages are skipped).
    pub run_prepare: bool,
}

/// What the checkout stage records per repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    /// The ref that was graded: a ranked tag, or the current branch when
    /// no ranked tag matched.
    pub selected_ref: String,

    /// Formatted timestamp of the most recent commit on the selected ref.
    pub commit_date: String,
}

/// Run the checkout stage for one repository, in isolation from the rest
/// of the fleet.
///
/// Tag listing failures degrade to "no tags available"; prepare command
/// failures are logged and ignored. Checkout/reset/log failures are
/// internal git errors and abort the run.
pub async fn run_checkout(
    runner: &ProcessRunner,
    repo: &Repository,
    policy: &CheckoutPolicy<'_>,
) -> Result<CheckoutOutcome> {
    let tags = match git::list_tags(&repo.location) {
        Ok(tags) => tags,
        Err(e) => {
            warn!(repo = %repo.name, "tag listing failed, assuming no tags: {e}");
            Vec::new()
        }
    };

    let ranked_match = policy
        .ranked_tags
        .iter()
        .find(|wanted| tags.iter().any(|tag| tag == *wanted));

    let selected_ref = match ranked_match {
        Some(tag) => {
            git::checkout_ref(&repo.location, tag)?;
            tag.clone()
        }
        None => git::current_branch(&repo.location)?,
    };

    if policy.reset {
        git::hard_reset(&repo.location)?;
    }

    let commit_date = git::last_commit_date(&repo.location, policy.date_format)?;

    if policy.run_prepare {
        for command in policy.prepare_commands {
            match runner
                .run(command, &repo.location, &repo.name, SpawnOptions::shell())
                .await
            {
                Ok(output) if !output.success() => {
                    // Non-fatal: downstream checks observe the breakage.
                    warn!(
                        repo = %repo.name,
                        "prepare command exited with {}: {command}",
                        output.exit_code
                    );
                }
                Err(e) => warn!(repo = %repo.name, "prepare command failed: {e}"),
                Ok(_) => {}
            }
        }
    }

    Ok(CheckoutOutcome {
        selected_ref,
        commit_date,
    })
}
