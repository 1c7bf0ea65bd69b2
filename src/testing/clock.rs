use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::github::clock::Clock;

/// A clock whose time only moves when something sleeps on it.
pub struct ManualClock {
    state: Mutex<ClockState>,
}

struct ClockState {
    now: Duration,
    unix_base: i64,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::with_unix_time(1_700_000_000)
    }

    pub fn with_unix_time(unix_base: i64) -> Self {
        Self {
            state: Mutex::new(ClockState {
                now: Duration::ZERO,
                unix_base,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.lock().now
    }

    fn unix_time(&self) -> i64 {
        let state = self.lock();
        state.unix_base + state.now.as_secs() as i64
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}
