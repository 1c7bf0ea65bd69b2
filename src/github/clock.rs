use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Time source for every wait the collector performs.
///
/// `elapsed` is monotonic and only meaningful relative to other readings
/// from the same clock. `unix_time` is wall-clock seconds, used to interpret
/// `x-ratelimit-reset`.
#[async_trait]
pub trait Clock: Send + Sync {
    fn elapsed(&self) -> Duration;
    fn unix_time(&self) -> i64;
    async fn sleep(&self, duration: Duration);
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn unix_time(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
