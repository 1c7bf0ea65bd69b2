use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::github::clock::Clock;
use crate::github::rate_limiter::{RateLimitSignal, RateLimiter};
use crate::github::retry::{AttemptResult, ExecutorState, RetryPolicy, RetryState, WaitReason};
use crate::github::transport::{Transport, TransportError};

/// A successful, fully parsed response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body; an empty body (e.g. 204) is `Value::Null`.
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    Timeout,
    Transport(String),
    Status(StatusCode),
    MalformedBody(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "request timed out"),
            FailureReason::Transport(msg) => write!(f, "transport failure: {}", msg),
            FailureReason::Status(status) => write!(f, "unexpected status {}", status),
            FailureReason::MalformedBody(msg) => write!(f, "malformed body: {}", msg),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestOutcome {
    Success(ApiResponse),
    /// Returned only once the consecutive rate-limit wait budget is spent.
    RateLimited(Duration),
    TerminalClientError(StatusCode),
    RetryableFailure(FailureReason),
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    pub fn into_result(self, url: &Url) -> Result<ApiResponse> {
        let url = url.to_string();
        match self {
            RequestOutcome::Success(response) => Ok(response),
            RequestOutcome::RateLimited(wait) => Err(Error::RateLimited(wait.as_secs())),
            RequestOutcome::TerminalClientError(status) => Err(match status {
                StatusCode::UNAUTHORIZED => Error::Authentication(url),
                StatusCode::FORBIDDEN => Error::Permission(url),
                StatusCode::NOT_FOUND => Error::NotFound(url),
                other => Error::GitHubApi {
                    url,
                    status: other.as_u16(),
                },
            }),
            RequestOutcome::RetryableFailure(reason) => Err(match reason {
                FailureReason::Timeout => Error::NetworkTimeout(url),
                FailureReason::Transport(msg) => Error::Transport(msg),
                FailureReason::Status(status) if status.is_server_error() => Error::ServerError {
                    url,
                    status: status.as_u16(),
                },
                FailureReason::Status(status) => Error::GitHubApi {
                    url,
                    status: status.as_u16(),
                },
                FailureReason::MalformedBody(reason) => {
                    Error::MalformedResponseBody { url, reason }
                }
            }),
        }
    }
}

/// Issues one logical GET, absorbing rate-limit waits and transient failures.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    rate_limiter: RateLimiter,
    policy: RetryPolicy,
    timeout: Duration,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            clock,
            rate_limiter: RateLimiter::new(),
            policy,
            timeout,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub async fn execute(
        &self,
        url: &Url,
        headers: &HeaderMap,
        query: &[(&str, &str)],
    ) -> RequestOutcome {
        let mut target = url.clone();
        if !query.is_empty() {
            target.query_pairs_mut().extend_pairs(query);
        }

        let mut retry = RetryState::new(self.policy.clone());
        let mut state = ExecutorState::Attempting;

        loop {
            state = match state {
                ExecutorState::Attempting => {
                    self.rate_limiter.wait(self.clock.as_ref()).await;
                    let result = self.attempt(&target, headers).await;
                    retry.advance(result)
                }
                ExecutorState::Waiting(WaitReason::RateLimit, wait) => {
                    tracing::warn!("Rate limit hit for {}. Retrying after {:?}", target, wait);
                    self.rate_limiter.block_for(self.clock.as_ref(), wait).await;
                    ExecutorState::Attempting
                }
                ExecutorState::Waiting(WaitReason::Backoff, wait) => {
                    tracing::info!(
                        "Retrying {} in {:?} (retry {}/{})",
                        target,
                        wait,
                        retry.retries(),
                        self.policy.max_retries
                    );
                    self.clock.sleep(wait).await;
                    ExecutorState::Attempting
                }
                ExecutorState::Done(outcome) => {
                    match &outcome {
                        RequestOutcome::RetryableFailure(reason) => tracing::error!(
                            "Max retries reached for {}: {}",
                            target,
                            reason
                        ),
                        RequestOutcome::RateLimited(_) => {
                            tracing::error!("Still rate limited for {}, giving up", target)
                        }
                        _ => {}
                    }
                    return outcome;
                }
            };
        }
    }

    async fn attempt(&self, url: &Url, headers: &HeaderMap) -> AttemptResult {
        tracing::debug!("Fetching: {}", url);
        let raw = match self.transport.get(url, headers, self.timeout).await {
            Ok(raw) => raw,
            Err(TransportError::Timeout(msg)) => {
                tracing::warn!("Request timed out for {}: {}", url, msg);
                return AttemptResult::Retryable(FailureReason::Timeout);
            }
            Err(TransportError::Connection(msg)) => {
                tracing::warn!("Request failed for {}: {}", url, msg);
                return AttemptResult::Retryable(FailureReason::Transport(msg));
            }
        };

        let signal = RateLimitSignal::from_headers(&raw.headers);
        self.rate_limiter.update(&signal).await;
        let status = raw.status;

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(retry_after) = signal.requested_wait(self.clock.unix_time()) {
                return AttemptResult::RateLimited { retry_after };
            }
            if raw.headers.contains_key(reqwest::header::RETRY_AFTER) {
                tracing::warn!(
                    "Rate limit hit for {}, but Retry-After could not be parsed; backing off",
                    url
                );
                return AttemptResult::Retryable(FailureReason::Status(status));
            }
        }

        match status {
            StatusCode::NOT_FOUND => {
                tracing::warn!("Resource not found (404) at {}", url);
                return AttemptResult::Terminal(status);
            }
            StatusCode::UNAUTHORIZED => {
                tracing::error!("Authorization failed (401) for {}. Check your GitHub token", url);
                return AttemptResult::Terminal(status);
            }
            StatusCode::FORBIDDEN => {
                tracing::error!("Forbidden (403) accessing {}. Check permissions or scope", url);
                return AttemptResult::Terminal(status);
            }
            StatusCode::CONFLICT => {
                tracing::debug!("Conflict (409) at {}", url);
                return AttemptResult::Terminal(status);
            }
            s if s.is_client_error() || s.is_server_error() => {
                tracing::warn!("Request to {} failed with status {}", url, s);
                return AttemptResult::Retryable(FailureReason::Status(s));
            }
            _ => {}
        }

        let body = if raw.body.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&raw.body) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Failed to decode JSON from {}: {}", url, e);
                    return AttemptResult::Retryable(FailureReason::MalformedBody(e.to_string()));
                }
            }
        };

        if signal.is_low(self.policy.low_remaining_threshold) {
            tracing::warn!(
                "Low rate limit remaining ({:?}). Adding small delay",
                signal.remaining
            );
            self.clock.sleep(self.policy.low_remaining_pause).await;
        }

        AttemptResult::Success(ApiResponse {
            url: url.clone(),
            status,
            headers: raw.headers,
            body,
        })
    }
}
