//! Grading pipeline orchestration.
//!
//! Drives the phases of spec'd control flow for an already-synchronized
//! fleet: checkout per repository, task stages per repository, rule
//! evaluation across the fleet, then the report merge and write. A single
//! control task runs it all; parallelism only ever comes from spawned
//! processes.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use fleetgrade_core::{EvalConfig, RepoSet, Result, ScoreBoard};

use crate::checkout::{run_checkout, CheckoutOutcome, CheckoutPolicy};
use crate::process::ProcessRunner;
use crate::report::{self, ReportTable};
use crate::rules::evaluate_rules;
use crate::scheduler::run_stages;

/// Run-level switches, normalised so the skip cascade holds:
/// skipping checks skips tasks, and skipping tasks skips prepare commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradingOptions {
    /// Hard-reset each work tree before grading (destructive).
    pub reset: bool,

    /// Skip task stages (and therefore prepare commands).
    pub skip_tasks: bool,

    /// Skip rule evaluation (and therefore task stages).
    pub skip_checks: bool,

    /// Suppress per-command log lines.
    pub quiet: bool,
}

impl GradingOptions {
    fn tasks_skipped(&self) -> bool {
        self.skip_tasks || self.skip_checks
    }

    fn prepare_skipped(&self) -> bool {
        self.tasks_skipped()
    }
}

/// Summary of a completed grading run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identifier, stamped on the log stream.
    pub run_id: Uuid,

    /// SHA-256 fingerprint of the rule configuration.
    pub rules_fingerprint: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Number of repositories graded.
    pub repos: usize,

    /// The merged report, as written to the destination.
    pub table: ReportTable,
}

/// Grading pipeline orchestrator.
pub struct GradingPipeline;

impl GradingPipeline {
    /// Grade the fleet and write the report to the configured destination.
    ///
    /// Internal failures (git, report I/O) abort before anything is
    /// written; user command failures only ever lower scores.
    pub async fn run(
        config: &EvalConfig,
        repos: &RepoSet,
        options: &GradingOptions,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let fingerprint = config.fingerprint();
        let short_rules = &fingerprint[..12];
        let runner = ProcessRunner::new(options.quiet);

        info!(
            run_id = %run_id,
            rules = %short_rules,
            repos = repos.len(),
            "starting grading run"
        );

        // Checkout phase: tag/date metadata per repository.
        let policy = CheckoutPolicy {
            ranked_tags: &config.checkout.ranked_allowed_tags,
            reset: options.reset,
            date_format: &config.checkout.date_format,
            prepare_commands: &config.checkout.prepare_commands,
            run_prepare: !options.prepare_skipped(),
        };
        let mut outcomes: BTreeMap<String, CheckoutOutcome> = BTreeMap::new();
        for repo in repos.iter() {
            let outcome = run_checkout(&runner, &repo, &policy).await?;
            debug!(repo = %repo.name, selected = %outcome.selected_ref, "checked out");
            outcomes.insert(repo.name.clone(), outcome);
        }

        // Task phase: build/test side effects, one repository at a time.
        if options.tasks_skipped() {
            info!(run_id = %run_id, "task stages skipped");
        } else {
            for repo in repos.iter() {
                run_stages(&runner, &repo, &config.tasks).await;
            }
        }

        // Rule evaluation across the fleet.
        let board = if options.skip_checks {
            info!(run_id = %run_id, "rule evaluation skipped");
            ScoreBoard::new()
        } else {
            evaluate_rules(&runner, repos, &config.rules).await?
        };

        // Report: merge with the template (when present) and write.
        let computed = report::build_computed(repos, &outcomes, &config.rules, &board);
        let template = match &config.output.template {
            Some(path) if path.exists() => Some(ReportTable::load(path)?),
            Some(path) => {
                debug!(template = %path.display(), "template not found, skipping merge");
                None
            }
            None => None,
        };
        let table = report::merge(computed, template);
        table.write(&config.output.output)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            output = %config.output.output.display(),
            duration_ms,
            "report written"
        );

        Ok(RunReport {
            run_id,
            rules_fingerprint: fingerprint,
            started_at,
            duration_ms,
            repos: repos.len(),
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_cascade_holds() {
        let only_tasks = GradingOptions {
            skip_tasks: true,
            ..Default::default()
        };
        assert!(only_tasks.tasks_skipped());
        assert!(only_tasks.prepare_skipped());

        let checks = GradingOptions {
            skip_checks: true,
            ..Default::default()
        };
        assert!(checks.tasks_skipped());
        assert!(checks.prepare_skipped());

        let none = GradingOptions::default();
        assert!(!none.tasks_skipped());
        assert!(!none.prepare_skipped());
    }
}
