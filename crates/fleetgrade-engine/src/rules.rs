//! Weighted rule evaluation: checks → partial credit → score cells.

use tracing::debug;

use fleetgrade_core::domain::rule::strip_one_newline;
use fleetgrade_core::{Check, Criterion, RepoSet, Repository, Result, RuleSet, ScoreBoard};

use crate::process::{ProcessRunner, SpawnOptions};

/// Evaluate every (rule, criterion) pair against every repository.
///
/// Criteria iterate in declaration order with repositories as the inner
/// loop: the whole fleet finishes criterion A before any repository starts
/// criterion B. Each score cell is recorded exactly once.
pub async fn evaluate_rules(
    runner: &ProcessRunner,
    repos: &RepoSet,
    rules: &RuleSet,
) -> Result<ScoreBoard> {
    let mut board = ScoreBoard::new();
    for (rule, criterion) in rules.criteria() {
        let field = RuleSet::field_name(rule, criterion);
        for repo in repos.iter() {
            let score = evaluate_criterion(runner, &repo, criterion).await;
            debug!(repo = %repo.name, field = %field, score, "criterion evaluated");
            board.record(&repo.name, &field, score)?;
        }
    }
    Ok(board)
}

/// Score one criterion for one repository.
///
/// All-or-nothing criteria return 0 on the first mismatch without issuing
/// the remaining checks' commands: their outcome cannot change the score.
/// Partial criteria run every check and credit each match's weight.
async fn evaluate_criterion(
    runner: &ProcessRunner,
    repo: &Repository,
    criterion: &Criterion,
) -> f64 {
    let mut total = 0.0;
    let mut gained = 0.0;

    for check in &criterion.checks {
        total += check.partial_weight;
        if run_check(runner, repo, check).await {
            gained += check.partial_weight;
        } else if !criterion.allow_partial {
            return 0.0;
        }
    }

    // Zero-check criteria are rejected at configuration load; this guard
    // keeps a hand-built criterion from producing NaN.
    if total > 0.0 {
        gained / total * criterion.weight
    } else {
        0.0
    }
}

/// Run one check and compare its stdout to the expectation.
///
/// Exactly one trailing newline is stripped before the byte-for-byte
/// comparison. A command that cannot be spawned counts as a mismatch.
async fn run_check(runner: &ProcessRunner, repo: &Repository, check: &Check) -> bool {
    match runner
        .run(
            &check.command,
            &repo.location,
            &repo.name,
            SpawnOptions::shell_captured(),
        )
        .await
    {
        Ok(output) => strip_one_newline(&output.stdout) == check.expected_stdout,
        Err(e) => {
            debug!(repo = %repo.name, "check command failed: {e}");
            false
        }
    }
}
