//! Fleetgrade Engine - grading pipeline execution
//!
//! Provides the grading orchestrator that:
//! - Discovers and syncs the repository fleet (origin + forks)
//! - Checks out a ranked tag (or the current branch) per repository
//! - Runs configured task stages (build/test side effects)
//! - Evaluates weighted rule checks into a score per criterion
//! - Merges and writes the tabular report

pub mod checkout;
pub mod discovery;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod rules;
pub mod scheduler;
pub mod sync;

// Re-export key types
pub use checkout::{run_checkout, CheckoutOutcome, CheckoutPolicy};
pub use discovery::{ForkSource, GithubForkSource, RemoteRepo};
pub use pipeline::{GradingOptions, GradingPipeline, RunReport};
pub use process::{ProcessHandle, ProcessRunner, RunOutput, SpawnOptions};
pub use report::ReportTable;
pub use rules::evaluate_rules;
pub use scheduler::run_stages;
pub use sync::{discover_and_sync, sync_all};
