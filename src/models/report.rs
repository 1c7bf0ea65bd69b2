use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repository::{DetailState, RepositoryRecord};

/// The finished output of a collection run, handed read-only to renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    pub owner: String,
    pub fetched_at: DateTime<Utc>,
    pub total_stars: u64,
    pub total_forks: u64,
    pub repositories: Vec<RepositoryRecord>,
}

impl CollectionReport {
    pub fn new(owner: &str, fetched_at: DateTime<Utc>, repositories: Vec<RepositoryRecord>) -> Self {
        let total_stars = repositories.iter().map(|r| r.stars).sum();
        let total_forks = repositories.iter().map(|r| r.forks).sum();
        Self {
            owner: owner.to_string(),
            fetched_at,
            total_stars,
            total_forks,
            repositories,
        }
    }

    pub fn repository_count(&self) -> usize {
        self.repositories.len()
    }

    /// Repositories are kept sorted by stars, so this is the head of the list.
    pub fn top_repositories(&self, n: usize) -> impl Iterator<Item = &RepositoryRecord> {
        self.repositories.iter().take(n)
    }

    pub fn failed_details(&self) -> impl Iterator<Item = (&str, &str)> {
        self.repositories.iter().filter_map(|r| match &r.details {
            DetailState::Failed { reason } => Some((r.full_name.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn pending_details(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| !r.processed_details())
            .count()
    }
}
