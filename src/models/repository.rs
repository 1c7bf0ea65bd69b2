use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository as returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRepository {
    #[serde(default = "unnamed")]
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub has_issues: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
}

fn unnamed() -> String {
    "N/A".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DetailState {
    Pending,
    Done,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub fork: bool,
    pub archived: bool,
    pub has_issues: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_pushed_at: Option<DateTime<Utc>>,
    pub commit_count: Option<u64>,
    pub contributor_count: Option<u64>,
    pub closed_issue_count: Option<u64>,
    /// `Some(0.0)` means no closed issues (or issues disabled); `None` means
    /// the aggregation could not read any page.
    pub avg_resolution_seconds: Option<f64>,
    pub details: DetailState,
}

impl RepositoryRecord {
    pub fn processed_details(&self) -> bool {
        self.details != DetailState::Pending
    }

    pub fn apply(&mut self, details: RepositoryDetails) {
        self.commit_count = details.commit_count;
        self.contributor_count = details.contributor_count;
        self.closed_issue_count = details.closed_issue_count;
        self.avg_resolution_seconds = details.avg_resolution_seconds;
        self.details = DetailState::Done;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.details = DetailState::Failed {
            reason: reason.into(),
        };
    }
}

impl From<ApiRepository> for RepositoryRecord {
    fn from(repo: ApiRepository) -> Self {
        let html_url = repo
            .html_url
            .unwrap_or_else(|| format!("https://github.com/{}", repo.full_name));
        Self {
            name: repo.name,
            full_name: repo.full_name,
            html_url,
            description: repo.description,
            language: repo.language,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            fork: repo.fork,
            archived: repo.archived,
            has_issues: repo.has_issues,
            created_at: repo.created_at,
            last_pushed_at: repo.pushed_at.or(repo.updated_at),
            commit_count: None,
            contributor_count: None,
            closed_issue_count: None,
            avg_resolution_seconds: None,
            details: DetailState::Pending,
        }
    }
}

/// Counters gathered by the detail pass for one repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryDetails {
    pub commit_count: Option<u64>,
    pub contributor_count: Option<u64>,
    pub closed_issue_count: Option<u64>,
    pub avg_resolution_seconds: Option<f64>,
}
