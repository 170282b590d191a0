//! Fleetgrade Core Library
//!
//! Domain model and leaf utilities for grading a fleet of related
//! repositories: configuration schema, repository set, rule model,
//! score board, git query layer, and tracing setup.

pub mod config;
pub mod domain;
pub mod git;
pub mod telemetry;

pub use config::{CheckoutConfig, EvalConfig, OriginConfig, OutputConfig};

pub use domain::{
    Check, CommandSpec, Criterion, FleetError, RepoSet, Repository, Result, Rule, RuleSet,
    RunMode, ScoreBoard, TaskStage,
};

pub use git::{
    checkout_ref, current_branch, hard_reset, is_git_repo, last_commit_date, list_tags,
};

pub use telemetry::init_tracing;

/// Fleetgrade version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
