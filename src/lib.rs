pub mod config;
pub mod error;
pub mod models;
pub mod github;
pub mod collection;
pub mod storage;
pub mod report;

#[cfg(test)]
pub mod testing;

pub use config::{CollectorConfig, Config};
pub use error::{Error, Result};
pub use github::{Credentials, GitHubClient};
pub use collection::{IssueResolutionAggregator, RepositoryStatsCollector};
pub use storage::Storage;
