//! Run configuration: schema, JSON loading, and load-time validation.
//!
//! The on-disk document keeps the externally agreed key names
//! (`ranked_allowed_tags`, `prepare_commands`, `seq_tasks`, `rules`). It is
//! deserialized into a raw shape first and converted into the typed domain
//! model in one validation pass, so every later use site reads named fields
//! with documented defaults instead of probing a dynamic document.
//!
//! Rule and criterion declaration order is preserved end-to-end: it decides
//! the report's criterion column order.

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::domain::error::{FleetError, Result};
use crate::domain::rule::{Check, Criterion, Rule, RuleSet};
use crate::domain::task::{CommandSpec, RunMode, TaskStage};

/// Default commit-date format handed to the git log query.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Default report destination.
pub const DEFAULT_OUTPUT: &str = "report.csv";

/// Where the fleet comes from: the origin repository on a GitHub-style host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OriginConfig {
    /// Owner/organisation of the origin repository.
    pub owner: String,

    /// Origin repository name.
    pub repo: String,

    /// API base URL; defaults to the public GitHub API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

/// Checkout-phase settings shared by every repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Acceptable tags in priority order; the first present in a repository
    /// wins. Empty means "grade the current branch".
    pub ranked_allowed_tags: Vec<String>,

    /// Commands run sequentially against each repository after checkout.
    pub prepare_commands: Vec<String>,

    /// Date format token passed verbatim to the revision-history query.
    pub date_format: String,
}

/// Report destination and optional merge template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub output: PathBuf,
    pub template: Option<PathBuf>,
}

/// Fully validated run configuration.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub origin: Option<OriginConfig>,
    pub checkout: CheckoutConfig,
    pub tasks: Vec<TaskStage>,
    pub rules: RuleSet,
    pub output: OutputConfig,
}

// Raw document shapes, converted by `EvalConfig::from_json`.

#[derive(Debug, Deserialize)]
struct RawConfig {
    origin: Option<OriginConfig>,
    #[serde(default)]
    ranked_allowed_tags: Vec<String>,
    #[serde(default)]
    prepare_commands: Vec<String>,
    #[serde(default)]
    seq_tasks: Vec<RawTaskStage>,
    rules: Option<serde_json::Map<String, Value>>,
    date_format: Option<String>,
    output: Option<PathBuf>,
    template: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawTaskStage {
    delay: Option<u64>,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    background: bool,
}

#[derive(Debug, Deserialize)]
struct RawCriterion {
    checks: Vec<RawCheck>,
    weight: Option<f64>,
    partial_weights_allowed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawCheck {
    command: String,
    stdout: String,
    partial_weight: Option<f64>,
}

impl EvalConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FleetError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)?;

        let rules_map = raw
            .rules
            .ok_or_else(|| FleetError::Config("missing required key: rules".to_string()))?;
        let rules = convert_rules(rules_map)?;

        let tasks = raw.seq_tasks.into_iter().map(convert_stage).collect();

        Ok(Self {
            origin: raw.origin,
            checkout: CheckoutConfig {
                ranked_allowed_tags: raw.ranked_allowed_tags,
                prepare_commands: raw.prepare_commands,
                date_format: raw
                    .date_format
                    .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
            },
            tasks,
            rules,
            output: OutputConfig {
                output: raw.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
                template: raw.template,
            },
        })
    }

    /// SHA-256 digest of the canonical rule set, stamped on each run so two
    /// reports are comparable only when graded by the same rules.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (rule, criterion) in self.rules.criteria() {
            hasher.update(rule.name.as_bytes());
            hasher.update(b"\0");
            hasher.update(criterion.name.as_bytes());
            hasher.update(b"\0");
            hasher.update(criterion.weight.to_le_bytes());
            hasher.update([u8::from(criterion.allow_partial)]);
            for check in &criterion.checks {
                hasher.update(check.command.as_bytes());
                hasher.update(b"\0");
                hasher.update(check.expected_stdout.as_bytes());
                hasher.update(b"\0");
                hasher.update(check.partial_weight.to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

fn convert_stage(raw: RawTaskStage) -> TaskStage {
    let mode = if raw.background {
        RunMode::Background
    } else {
        RunMode::Sync
    };
    TaskStage {
        delay_secs: raw.delay,
        commands: raw
            .commands
            .into_iter()
            .map(|text| CommandSpec {
                text,
                run_mode: mode,
                capture_output: false,
            })
            .collect(),
        concurrent: raw.background,
    }
}

fn convert_rules(map: serde_json::Map<String, Value>) -> Result<RuleSet> {
    if map.is_empty() {
        return Err(FleetError::Config("rules table is empty".to_string()));
    }

    let mut rules = Vec::with_capacity(map.len());
    for (rule_name, rule_value) in map {
        let criteria_map = rule_value.as_object().ok_or_else(|| {
            FleetError::Config(format!("rule {rule_name} is not a criterion table"))
        })?;

        let mut rule = Rule::new(&rule_name);
        for (criterion_name, criterion_value) in criteria_map {
            let raw: RawCriterion = serde_json::from_value(criterion_value.clone())?;
            rule = rule.add_criterion(convert_criterion(&rule_name, criterion_name, raw)?);
        }
        rules.push(rule);
    }
    Ok(RuleSet::new(rules))
}

fn convert_criterion(rule: &str, name: &str, raw: RawCriterion) -> Result<Criterion> {
    // A criterion with no checks has no score denominator; reject it here
    // rather than letting the engine divide by zero.
    if raw.checks.is_empty() {
        return Err(FleetError::Config(format!(
            "criterion {rule}-{name} has no checks"
        )));
    }

    let mut criterion = Criterion::new(name)
        .with_weight(raw.weight.unwrap_or(1.0))
        .with_allow_partial(raw.partial_weights_allowed.unwrap_or(false));

    for check in raw.checks {
        let weight = check.partial_weight.unwrap_or(1.0);
        if weight < 0.0 {
            return Err(FleetError::Config(format!(
                "criterion {rule}-{name}: negative partial_weight {weight}"
            )));
        }
        criterion = criterion
            .add_check(Check::new(check.command, check.stdout).with_partial_weight(weight));
    }
    Ok(criterion)
}
