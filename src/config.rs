use crate::error::{Error, Result};
use crate::github::client::DEFAULT_API_URL;
use crate::github::RetryPolicy;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub api_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub concurrency_limit: usize,
    pub database_path: String,
    pub cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let github_token = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());

        let api_url = lookup("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let request_timeout = Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 15)?);

        let max_retries = parse_or(&lookup, "MAX_RETRIES", RetryPolicy::default().max_retries)?;

        let concurrency_limit = parse_or(&lookup, "CONCURRENCY_LIMIT", 1usize)?;
        if concurrency_limit == 0 {
            return Err(Error::Config("CONCURRENCY_LIMIT must be at least 1".to_string()));
        }

        let database_path = lookup("DATABASE_PATH").unwrap_or_else(|| "repostats.db".to_string());

        let cache_ttl = Duration::from_secs(60 * parse_or(&lookup, "CACHE_TTL_MINUTES", 60u64)?);

        Ok(Self {
            github_token,
            api_url,
            request_timeout,
            max_retries,
            concurrency_limit,
            database_path,
            cache_ttl,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_retries(self.max_retries)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, value))),
        None => Ok(default),
    }
}

/// Pacing and fan-out settings for a collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub list_page_size: u32,
    pub list_page_delay: Duration,
    pub repo_delay: Duration,
    /// Repositories whose details are fetched at the same time.
    pub concurrency_limit: usize,
    pub show_progress: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            list_page_size: 100,
            list_page_delay: Duration::from_millis(200),
            repo_delay: Duration::from_millis(50),
            concurrency_limit: 1,
            show_progress: false,
        }
    }
}

impl From<&Config> for CollectorConfig {
    fn from(config: &Config) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            ..Self::default()
        }
    }
}
