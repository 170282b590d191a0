//! Fork discovery against a GitHub-style hosting API.
//!
//! Discovery is the only networked collaborator in a grading run. It is
//! kept behind the [`ForkSource`] trait so the sync barrier and tests can
//! run against a fake fleet without HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use fleetgrade_core::config::OriginConfig;
use fleetgrade_core::{FleetError, Result};

const FORKS_PER_PAGE: usize = 100;

/// A repository as known to the hosting service.
///
/// `name` is the fork owner's login: forks all share the origin's repository
/// name, so the owner is the unique key within a fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    pub name: String,
    pub clone_url: String,
}

/// Source of the repository fleet.
#[async_trait]
pub trait ForkSource: Send + Sync {
    /// The origin repository itself.
    async fn origin(&self) -> Result<RemoteRepo>;

    /// All forks of the origin.
    async fn list_forks(&self) -> Result<Vec<RemoteRepo>>;
}

/// Fork source backed by the GitHub REST API (or a compatible host).
pub struct GithubForkSource {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GithubForkSource {
    pub fn new(origin: &OriginConfig, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: origin.api_base.trim_end_matches('/').to_string(),
            owner: origin.owner.clone(),
            repo: origin.repo.clone(),
            token,
        }
    }

    async fn get_json(&self, url: &str) -> Result<String> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", "fleetgrade")
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FleetError::Discovery(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FleetError::Discovery(format!(
                "GET {url} returned {status}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| FleetError::Discovery(format!("reading {url}: {e}")))
    }
}

#[async_trait]
impl ForkSource for GithubForkSource {
    async fn origin(&self) -> Result<RemoteRepo> {
        let url = format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo);
        let body = self.get_json(&url).await?;
        let entry: ForkEntry = serde_json::from_str(&body)?;
        Ok(entry.into())
    }

    async fn list_forks(&self) -> Result<Vec<RemoteRepo>> {
        let mut forks = Vec::new();
        for page in 1.. {
            let url = format!(
                "{}/repos/{}/{}/forks?per_page={FORKS_PER_PAGE}&page={page}",
                self.api_base, self.owner, self.repo
            );
            let body = self.get_json(&url).await?;
            let batch = parse_fork_page(&body)?;
            let last_page = batch.len() < FORKS_PER_PAGE;
            debug!(page, count = batch.len(), "fork page fetched");
            forks.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(forks)
    }
}

#[derive(Debug, Deserialize)]
struct ForkEntry {
    clone_url: String,
    owner: ForkOwner,
}

#[derive(Debug, Deserialize)]
struct ForkOwner {
    login: String,
}

impl From<ForkEntry> for RemoteRepo {
    fn from(entry: ForkEntry) -> Self {
        Self {
            name: entry.owner.login,
            clone_url: entry.clone_url,
        }
    }
}

/// Decode one page of the forks listing.
fn parse_fork_page(body: &str) -> Result<Vec<RemoteRepo>> {
    let entries: Vec<ForkEntry> = serde_json::from_str(body)?;
    Ok(entries.into_iter().map(RemoteRepo::from).collect())
}
