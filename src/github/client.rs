use reqwest::{header, Url};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::github::clock::{Clock, SystemClock};
use crate::github::executor::{RequestExecutor, RequestOutcome};
use crate::github::retry::RetryPolicy;
use crate::github::transport::{ReqwestTransport, Transport};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Credentials for one collection run. A missing token is allowed but
/// leaves the caller on the much smaller anonymous rate limit.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub token: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("repostats/0.1"),
        );

        match self.token.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                headers.insert(
                    header::AUTHORIZATION,
                    header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))?,
                );
            }
            None => {
                tracing::warn!("No GitHub token provided. Rate limits will be stricter");
            }
        }

        Ok(headers)
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    executor: RequestExecutor,
    base_url: Url,
}

impl GitHubClient {
    pub fn new(base_url: &str, policy: RetryPolicy, timeout: Duration) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        Self::with_parts(base_url, transport, clock, policy, timeout)
    }

    pub fn with_parts(
        base_url: &str,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends with '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            executor: RequestExecutor::new(transport, clock, policy, timeout),
            base_url,
        })
    }

    pub fn clock(&self) -> &dyn Clock {
        self.executor.clock()
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", path, e)))
    }

    pub fn session(&self, credentials: &Credentials) -> Result<ApiSession> {
        Ok(ApiSession {
            client: self.clone(),
            headers: credentials.headers()?,
        })
    }
}

/// A client bound to one run's request headers.
#[derive(Clone)]
pub struct ApiSession {
    client: GitHubClient,
    headers: header::HeaderMap,
}

impl ApiSession {
    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    pub async fn get(&self, url: &Url, query: &[(&str, &str)]) -> RequestOutcome {
        self.client.executor.execute(url, &self.headers, query).await
    }

    pub async fn list_repositories_page(
        &self,
        owner: &str,
        page: u32,
        per_page: u32,
    ) -> Result<(Url, RequestOutcome)> {
        let url = self.client.endpoint(&format!("users/{}/repos", owner))?;
        let page = page.to_string();
        let per_page = per_page.to_string();
        tracing::debug!("Fetching repositories for {} (page {})", owner, page);
        let outcome = self
            .get(
                &url,
                &[
                    ("page", page.as_str()),
                    ("per_page", per_page.as_str()),
                    ("type", "owner"),
                    ("sort", "full_name"),
                ],
            )
            .await;
        Ok((url, outcome))
    }

    pub async fn commits_probe(&self, full_name: &str) -> Result<(Url, RequestOutcome)> {
        let url = self.client.endpoint(&format!("repos/{}/commits", full_name))?;
        let outcome = self.get(&url, &[("per_page", "1")]).await;
        Ok((url, outcome))
    }

    pub async fn contributors_probe(&self, full_name: &str) -> Result<(Url, RequestOutcome)> {
        let url = self
            .client
            .endpoint(&format!("repos/{}/contributors", full_name))?;
        let outcome = self.get(&url, &[("per_page", "1"), ("anon", "true")]).await;
        Ok((url, outcome))
    }

    pub async fn closed_issues_probe(&self, full_name: &str) -> Result<(Url, RequestOutcome)> {
        let url = self.client.endpoint(&format!("repos/{}/issues", full_name))?;
        let outcome = self.get(&url, &[("state", "closed"), ("per_page", "1")]).await;
        Ok((url, outcome))
    }

    pub async fn closed_issues_page(
        &self,
        full_name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<(Url, RequestOutcome)> {
        let url = self.client.endpoint(&format!("repos/{}/issues", full_name))?;
        let page = page.to_string();
        let per_page = per_page.to_string();
        let outcome = self
            .get(
                &url,
                &[
                    ("state", "closed"),
                    ("page", page.as_str()),
                    ("per_page", per_page.as_str()),
                ],
            )
            .await;
        Ok((url, outcome))
    }
}
