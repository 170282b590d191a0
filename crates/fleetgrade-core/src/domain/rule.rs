//! Grading rules: checks, criteria, and the declaration-ordered rule set.

use serde::{Deserialize, Serialize};

/// A single command-vs-expected-output comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Check {
    /// Shell command whose stdout is captured and compared.
    pub command: String,

    /// Expected stdout, with at most one trailing newline already stripped.
    pub expected_stdout: String,

    /// Share of the criterion's credit this check can contribute.
    pub partial_weight: f64,
}

impl Check {
    pub fn new(command: impl Into<String>, expected_stdout: impl Into<String>) -> Self {
        let expected: String = expected_stdout.into();
        Self {
            command: command.into(),
            expected_stdout: strip_one_newline(&expected).to_string(),
            partial_weight: 1.0,
        }
    }

    pub fn with_partial_weight(mut self, weight: f64) -> Self {
        self.partial_weight = weight;
        self
    }
}

/// Strip exactly one trailing newline, if present.
pub fn strip_one_newline(s: &str) -> &str {
    s.strip_suffix('\n').unwrap_or(s)
}

/// One gradable dimension: an ordered list of checks and a weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Criterion name within its rule.
    pub name: String,

    /// Checks in declaration order.
    pub checks: Vec<Check>,

    /// The criterion's contribution to the final score.
    pub weight: f64,

    /// Allow matching checks to earn credit even when others mismatch.
    /// When false the criterion is all-or-nothing: the first mismatch
    /// zeroes it.
    pub allow_partial: bool,
}

impl Criterion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            checks: Vec::new(),
            weight: 1.0,
            allow_partial: false,
        }
    }

    pub fn add_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_allow_partial(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }

    /// Sum of all partial weights. Positive whenever the criterion has at
    /// least one check with the default weight.
    pub fn total_partial_weight(&self) -> f64 {
        self.checks.iter().map(|c| c.partial_weight).sum()
    }
}

/// A named group of criteria, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub name: String,
    pub criteria: Vec<Criterion>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            criteria: Vec::new(),
        }
    }

    pub fn add_criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }
}

/// All grading rules for a run, preserving configuration declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Report field name for a (rule, criterion) pair.
    pub fn field_name(rule: &Rule, criterion: &Criterion) -> String {
        format!("{}-{}", rule.name, criterion.name)
    }

    /// All criterion field names, in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.rules
            .iter()
            .flat_map(|rule| {
                rule.criteria
                    .iter()
                    .map(move |criterion| Self::field_name(rule, criterion))
            })
            .collect()
    }

    /// Iterate (rule, criterion) pairs in declaration order.
    pub fn criteria(&self) -> impl Iterator<Item = (&Rule, &Criterion)> {
        self.rules
            .iter()
            .flat_map(|rule| rule.criteria.iter().map(move |c| (rule, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_strips_one_trailing_newline() {
        let check = Check::new("echo ok", "ok\n");
        assert_eq!(check.expected_stdout, "ok");

        // Only one newline is stripped.
        let check = Check::new("printf 'a\\n\\n'", "a\n\n");
        assert_eq!(check.expected_stdout, "a\n");
    }

    #[test]
    fn test_check_default_partial_weight() {
        let check = Check::new("true && echo ok", "ok");
        assert_eq!(check.partial_weight, 1.0);

        let weighted = check.with_partial_weight(0.25);
        assert_eq!(weighted.partial_weight, 0.25);
    }

    #[test]
    fn test_criterion_defaults() {
        let criterion = Criterion::new("binary-exists");
        assert_eq!(criterion.weight, 1.0);
        assert!(!criterion.allow_partial);
        assert!(criterion.checks.is_empty());
    }

    #[test]
    fn test_total_partial_weight() {
        let criterion = Criterion::new("tests")
            .add_check(Check::new("run-a", "ok").with_partial_weight(2.0))
            .add_check(Check::new("run-b", "ok"));
        assert_eq!(criterion.total_partial_weight(), 3.0);
    }

    #[test]
    fn test_field_names_declaration_order() {
        let set = RuleSet::new(vec![
            Rule::new("build")
                .add_criterion(Criterion::new("compiles"))
                .add_criterion(Criterion::new("warnings")),
            Rule::new("test").add_criterion(Criterion::new("unit")),
        ]);
        assert_eq!(
            set.field_names(),
            vec!["build-compiles", "build-warnings", "test-unit"]
        );
    }
}
