//! Repository identity and the ordered repository set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::error::{FleetError, Result};

/// A single repository under evaluation: the origin or one of its forks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Unique name within the run, e.g. the fork owner's login.
    pub name: String,

    /// Working directory holding the clone.
    pub location: PathBuf,
}

impl Repository {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

/// The fleet under evaluation, ordered lexicographically by name.
///
/// Names are unique; inserting a duplicate replaces nothing and is an error.
/// The set is produced once by the sync collaborator and consumed read-only
/// by every grading stage.
#[derive(Debug, Clone, Default)]
pub struct RepoSet {
    repos: BTreeMap<String, PathBuf>,
}

impl RepoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a repository. Errors if the name is already present.
    pub fn insert(&mut self, repo: Repository) -> Result<()> {
        if self.repos.contains_key(&repo.name) {
            return Err(FleetError::Config(format!(
                "duplicate repository name: {}",
                repo.name
            )));
        }
        self.repos.insert(repo.name, repo.location);
        Ok(())
    }

    /// Number of repositories in the set.
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Iterate repositories in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = Repository> + '_ {
        self.repos
            .iter()
            .map(|(name, location)| Repository::new(name.clone(), location.clone()))
    }

    /// Look up a repository's working directory by name.
    pub fn location(&self, name: &str) -> Option<&Path> {
        self.repos.get(name).map(PathBuf::as_path)
    }

    /// Build a set from every direct subdirectory of `root` that is a git
    /// work tree, named after the subdirectory.
    ///
    /// This is the local counterpart of the sync collaborator: it picks up
    /// clones left behind by a previous `sync` invocation.
    pub fn discover_local(root: &Path) -> Result<Self> {
        let mut set = Self::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || !crate::git::is_git_repo(&path) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            set.insert(Repository::new(name, path))?;
        }
        Ok(set)
    }
}
