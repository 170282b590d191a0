//! Computed score cells, keyed by (repository, criterion field).

use std::collections::BTreeMap;

use crate::domain::error::{FleetError, Result};

/// Owned results map for a grading run.
///
/// Each cell is computed exactly once per (repository, criterion field) and
/// never mutated afterward; the board is passed by ownership through the
/// pipeline rather than accumulated as ambient state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBoard {
    cells: BTreeMap<(String, String), f64>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a score cell. Recording the same (repository, field) twice is
    /// a logic error and is rejected.
    pub fn record(
        &mut self,
        repo: impl Into<String>,
        field: impl Into<String>,
        score: f64,
    ) -> Result<()> {
        let key = (repo.into(), field.into());
        if self.cells.contains_key(&key) {
            return Err(FleetError::Report(format!(
                "score for ({}, {}) already recorded",
                key.0, key.1
            )));
        }
        self.cells.insert(key, score);
        Ok(())
    }

    /// Look up the score for a (repository, field) pair.
    pub fn get(&self, repo: &str, field: &str) -> Option<f64> {
        self.cells
            .get(&(repo.to_string(), field.to_string()))
            .copied()
    }

    /// Number of recorded cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
