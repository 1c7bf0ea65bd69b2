use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::github::clock::Clock;

/// Rate-limit hints carried by a single response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitSignal {
    pub remaining: Option<u32>,
    pub retry_after_secs: Option<u64>,
    /// Unix timestamp at which the primary quota resets.
    pub reset_at: Option<i64>,
}

impl RateLimitSignal {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            remaining: header_number(headers, "x-ratelimit-remaining"),
            retry_after_secs: header_number(headers, "retry-after"),
            reset_at: header_number(headers, "x-ratelimit-reset"),
        }
    }

    /// How long the server asked us to back off, if it asked at all.
    ///
    /// An explicit `Retry-After` wins; otherwise an exhausted primary quota
    /// waits until its reset time.
    pub fn requested_wait(&self, now_unix: i64) -> Option<Duration> {
        if let Some(secs) = self.retry_after_secs {
            return Some(Duration::from_secs(secs));
        }
        match (self.remaining, self.reset_at) {
            (Some(0), Some(reset)) => Some(Duration::from_secs(reset.saturating_sub(now_unix).max(0) as u64)),
            _ => None,
        }
    }

    pub fn is_low(&self, threshold: u32) -> bool {
        self.remaining.map(|r| r < threshold).unwrap_or(false)
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Rate-limit state shared by every request issued through one client.
///
/// A rate-limit wait observed by one worker closes the gate for all of them
/// until the window has passed.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimitState>>,
}

#[derive(Default)]
struct RateLimitState {
    remaining: Option<u32>,
    blocked_until: Option<Duration>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimitState::default())),
        }
    }

    /// Sleeps until any gate set by `block_for` has expired, including
    /// extensions made by other workers while this one slept.
    pub async fn wait(&self, clock: &dyn Clock) {
        loop {
            let mut state = self.state.lock().await;
            let Some(until) = state.blocked_until else {
                return;
            };
            let now = clock.elapsed();
            if until <= now {
                state.blocked_until = None;
                return;
            }
            drop(state);

            let wait_duration = until - now;
            tracing::info!("Rate limited, waiting {:?}", wait_duration);
            clock.sleep(wait_duration).await;
        }
    }

    pub async fn block_for(&self, clock: &dyn Clock, duration: Duration) {
        let mut state = self.state.lock().await;
        let until = clock.elapsed() + duration;
        if state.blocked_until.map(|current| until > current).unwrap_or(true) {
            state.blocked_until = Some(until);
        }
    }

    pub async fn update(&self, signal: &RateLimitSignal) {
        if let Some(remaining) = signal.remaining {
            self.state.lock().await.remaining = Some(remaining);
        }
    }

    pub async fn remaining(&self) -> Option<u32> {
        self.state.lock().await.remaining
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
